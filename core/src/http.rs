//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. The endpoint sets build an
//! `HttpRequest`, a `Transport` turns it into an `HttpResponse`, and the
//! response classifier interprets the result. Nothing in this module knows
//! about the KYT API itself, so a fake transport is enough to test every
//! endpoint without a network.
//!
//! All fields use owned types so requests can be recorded and compared in
//! tests without lifetime concerns.

use std::fmt;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` never contains a query string; query parameters travel separately
/// in `query` and are encoded by the transport. An empty `query` means the
/// request carries no query string at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a query parameter by exact name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes one HTTP round-trip.
///
/// Implementations must return every response the server sends, including
/// 4xx and 5xx statuses, as `Ok`. `Err` is reserved for failures where no
/// response was obtained (DNS, refused connection, broken body stream).
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/v1/users/".to_string(),
            headers: vec![("Token".to_string(), "secret".to_string())],
            query: vec![("limit".to_string(), "10".to_string())],
            body: None,
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request();
        assert_eq!(req.header("token"), Some("secret"));
        assert_eq!(req.header("TOKEN"), Some("secret"));
        assert_eq!(req.header("Accept"), None);
    }

    #[test]
    fn query_lookup_is_exact() {
        let req = request();
        assert_eq!(req.query_param("limit"), Some("10"));
        assert_eq!(req.query_param("offset"), None);
    }

    #[test]
    fn method_display_matches_wire_verb() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
