//! Error types for the KYT API client.
//!
//! # Design
//! The status-driven variants mirror the service's error contract: 400, 403,
//! 404 and 429 each get a dedicated variant, every other non-success status
//! lands in `Api` with its code. Each carries the human-readable message
//! extracted from the response body. Failures where no response was obtained
//! at all are kept apart in `Transport` so callers never confuse a refused
//! connection with a rejection by the service.

use std::error::Error as StdError;

use thiserror::Error;

/// Errors returned by every KYT client operation.
#[derive(Debug, Error)]
pub enum KytError {
    /// The service returned 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The service returned 403, usually a missing or invalid API key.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service returned 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service returned 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service returned any other non-success status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// No response was obtained from the service.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A success response carried a body that is not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl KytError {
    /// The HTTP status behind a status-driven error, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            KytError::BadRequest(_) => Some(400),
            KytError::Authentication(_) => Some(403),
            KytError::NotFound(_) => Some(404),
            KytError::RateLimited(_) => Some(429),
            KytError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message extracted from the error response body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            KytError::BadRequest(message)
            | KytError::Authentication(message)
            | KytError::NotFound(message)
            | KytError::RateLimited(message)
            | KytError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A failure to complete the HTTP round-trip.
#[derive(Debug, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
