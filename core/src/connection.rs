//! Request building and execution against the two service roots.
//!
//! # Design
//! A `Connection` binds one service root to the credential headers and the
//! transport. `BaseClient` owns one lazily created connection per root and
//! is the only thing the endpoint sets talk to: they hand it a relative
//! path plus query or body, and get back the classified response.

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::KytError;
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::response::handle_response;

/// Header carrying the API key.
pub const TOKEN_HEADER: &str = "Token";

/// Query parameters as ordered name/value pairs.
pub type Query = Vec<(String, String)>;

/// One service root with its default headers.
#[derive(Debug)]
pub struct Connection {
    root: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl Connection {
    pub fn new(root: &str, api_key: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            headers: vec![
                (TOKEN_HEADER.to_string(), api_key.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            transport,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }

    pub fn build_get(&self, path: &str, query: Query) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path),
            headers: self.headers.clone(),
            query,
            body: None,
        }
    }

    /// Build a POST. Empty objects, empty arrays and `null` produce no body.
    pub fn build_post(&self, path: &str, body: &Value) -> Result<HttpRequest, KytError> {
        let body = if is_empty_payload(body) {
            None
        } else {
            Some(serde_json::to_string(body).map_err(|e| KytError::Serialization(e.to_string()))?)
        };
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(path),
            headers: self.headers.clone(),
            query: Vec::new(),
            body,
        })
    }

    pub fn build_delete(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: self.url(path),
            headers: self.headers.clone(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Send a request through the transport and classify the response.
    pub fn execute(&self, request: HttpRequest) -> Result<Value, KytError> {
        debug!(
            method = %request.method,
            url = %request.url,
            query_params = request.query.len(),
            has_body = request.body.is_some(),
            "sending request"
        );
        let response = self.transport.send(&request)?;
        handle_response(response)
    }
}

fn is_empty_payload(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Convert any serializable payload into a JSON value.
pub fn to_payload<T: Serialize + ?Sized>(payload: &T) -> Result<Value, KytError> {
    serde_json::to_value(payload).map_err(|e| KytError::Serialization(e.to_string()))
}

/// Shared request pipeline for the V1 and V2 endpoint sets.
///
/// Connections are created on first use and reused for the lifetime of the
/// client.
#[derive(Debug)]
pub struct BaseClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    client: OnceLock<Connection>,
    admin_client: OnceLock<Connection>,
}

impl BaseClient {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            client: OnceLock::new(),
            admin_client: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    /// The connection for the resource root, or the admin root when `admin`
    /// is set.
    pub fn connection(&self, admin: bool) -> &Connection {
        let cell = if admin { &self.admin_client } else { &self.client };
        cell.get_or_init(|| {
            Connection::new(self.config.root(admin), &self.config.api_key, self.transport.clone())
        })
    }

    pub fn get_request(&self, path: &str, query: Query, admin: bool) -> Result<Value, KytError> {
        let connection = self.connection(admin);
        connection.execute(connection.build_get(path, query))
    }

    pub fn post_request(&self, path: &str, body: &Value) -> Result<Value, KytError> {
        let connection = self.connection(false);
        connection.execute(connection.build_post(path, body)?)
    }

    pub fn delete_request(&self, path: &str) -> Result<Value, KytError> {
        let connection = self.connection(false);
        connection.execute(connection.build_delete(path))
    }
}

/// Query pairs for the optional `limit` and `offset` parameters.
pub fn paging(limit: Option<u32>, offset: Option<u32>) -> Query {
    let mut query = Query::new();
    if let Some(limit) = limit {
        query.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = offset {
        query.push(("offset".to_string(), offset.to_string()));
    }
    query
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::RecordingTransport;

    fn base(transport: Arc<RecordingTransport>) -> BaseClient {
        let config = ClientConfig {
            api_key: "test-key".to_string(),
            base_url: "http://kyt.test/api/kyt/".to_string(),
            admin_url: "http://kyt.test/admin".to_string(),
        };
        BaseClient::new(Arc::new(config), transport)
    }

    #[test]
    fn every_request_carries_default_headers() {
        let transport = RecordingTransport::replying(200, "");
        let client = base(transport.clone());
        client.get_request("v2/categories", Query::new(), false).unwrap();
        client.post_request("v1/users/rename", &json!([{"from": "a", "to": "b"}])).unwrap();
        client.delete_request("v1/users/u/depositaddresses/BTC/addr").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        for req in &requests {
            assert_eq!(req.header("Token"), Some("test-key"));
            assert_eq!(req.header("Accept"), Some("application/json"));
            assert_eq!(req.header("Content-Type"), Some("application/json"));
            assert_eq!(req.headers.len(), 3);
        }
    }

    #[test]
    fn trailing_slash_on_root_is_stripped() {
        let transport = RecordingTransport::replying(200, "{}");
        base(transport.clone())
            .get_request("v1/alerts/", Query::new(), false)
            .unwrap();
        assert_eq!(transport.last().url, "http://kyt.test/api/kyt/v1/alerts/");
    }

    #[test]
    fn admin_flag_selects_admin_root() {
        let transport = RecordingTransport::replying(200, "{}");
        base(transport.clone())
            .get_request("organization/users", Query::new(), true)
            .unwrap();
        assert_eq!(transport.last().url, "http://kyt.test/admin/organization/users");
    }

    #[test]
    fn get_without_query_has_no_params() {
        let transport = RecordingTransport::replying(200, "{}");
        base(transport.clone())
            .get_request("v1/users/", paging(None, None), false)
            .unwrap();
        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.query.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn empty_post_payload_sends_no_body() {
        let transport = RecordingTransport::replying(200, "");
        let client = base(transport.clone());
        client.post_request("v1/users/rename", &json!({})).unwrap();
        client.post_request("v1/users/rename", &json!([])).unwrap();
        client.post_request("v1/users/rename", &Value::Null).unwrap();
        for req in transport.requests() {
            assert_eq!(req.method, HttpMethod::Post);
            assert!(req.body.is_none());
        }
    }

    #[test]
    fn post_payload_is_serialized() {
        let transport = RecordingTransport::replying(201, r#"{"ok":true}"#);
        let result = base(transport.clone())
            .post_request("v1/alerts/a1/assignment", &json!({"alertAssignee": "jane"}))
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        let body: Value = serde_json::from_str(transport.last().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"alertAssignee": "jane"}));
    }

    #[test]
    fn delete_has_no_body_or_query() {
        let transport = RecordingTransport::replying(200, "");
        let result = base(transport.clone())
            .delete_request("v1/users/u/withdrawaladdresses/BTC/1abc")
            .unwrap();
        assert_eq!(result, json!({}));
        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
        assert!(req.query.is_empty());
    }

    #[test]
    fn connections_are_memoized_per_root() {
        let client = base(RecordingTransport::replying(200, ""));
        let first = client.connection(false) as *const Connection;
        let second = client.connection(false) as *const Connection;
        let admin = client.connection(true) as *const Connection;
        assert!(std::ptr::eq(first, second));
        assert!(!std::ptr::eq(first, admin));
        assert_eq!(client.connection(true).root(), "http://kyt.test/admin");
    }

    #[test]
    fn transport_failure_is_propagated() {
        let transport = RecordingTransport::failing("connection refused");
        let err = base(transport).get_request("v2/categories", Query::new(), false).unwrap_err();
        assert!(matches!(err, KytError::Transport(ref e) if e.message() == "connection refused"));
    }

    #[test]
    fn error_status_is_classified() {
        let transport = RecordingTransport::replying(403, r#"{"message":"bad token"}"#);
        let err = base(transport).get_request("v2/categories", Query::new(), false).unwrap_err();
        assert!(matches!(err, KytError::Authentication(ref m) if m == "bad token"));
    }

    #[test]
    fn paging_includes_only_supplied_values() {
        assert!(paging(None, None).is_empty());
        assert_eq!(paging(Some(10), None), vec![("limit".to_string(), "10".to_string())]);
        assert_eq!(
            paging(Some(0), Some(20)),
            vec![
                ("limit".to_string(), "0".to_string()),
                ("offset".to_string(), "20".to_string()),
            ]
        );
    }
}
