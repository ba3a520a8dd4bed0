//! Response classification.
//!
//! Turns a raw status/body pair into either the decoded JSON payload or a
//! typed `KytError`. Success bodies must be valid JSON; error bodies are
//! tolerated as free text.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::KytError;
use crate::http::HttpResponse;

/// Classify a response by status code.
///
/// 200, 201 and 202 are successes. An empty success body decodes to an empty
/// JSON object. 400, 403, 404 and 429 map to their dedicated variants and
/// every other status to `KytError::Api`.
pub fn handle_response(response: HttpResponse) -> Result<Value, KytError> {
    debug!(status = response.status, "classifying response");
    match response.status {
        200 | 201 | 202 => {
            if response.body.is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            serde_json::from_str(&response.body)
                .map_err(|e| KytError::Deserialization(e.to_string()))
        }
        status => {
            let message = error_message(&response.body);
            warn!(status, %message, "request rejected");
            Err(match status {
                400 => KytError::BadRequest(message),
                403 => KytError::Authentication(message),
                404 => KytError::NotFound(message),
                429 => KytError::RateLimited(message),
                _ => KytError::Api { status, message },
            })
        }
    }
}

/// Extract a human-readable message from an error body.
///
/// Prefers a string `message` field, then a string `error` field, and falls
/// back to the raw body when neither is present or the body is not JSON.
pub fn error_message(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => ["message", "error"]
            .iter()
            .find_map(|field| parsed.get(*field).and_then(Value::as_str))
            .map_or_else(|| body.to_string(), str::to_string),
        Err(_) => body.to_string(),
    }
}
