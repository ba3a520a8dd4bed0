//! Entry point exposing the V1 and V2 endpoint sets side by side.
//!
//! # Design
//! `KytClient` owns the credential and the transport. The versioned clients
//! are created on first access and then reused; both share the same
//! `Arc<ClientConfig>` and `Arc<dyn Transport>`, so a facade and everything
//! derived from it always talk to the same roots with the same key.

use std::sync::{Arc, OnceLock};

use crate::config::ClientConfig;
use crate::http::Transport;
use crate::transport::UreqTransport;
use crate::v1::V1Client;
use crate::v2::V2Client;

/// Client for the KYT API.
#[derive(Debug)]
pub struct KytClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    v1: OnceLock<V1Client>,
    v2: OnceLock<V2Client>,
}

impl KytClient {
    /// Client against the public service roots using the blocking ureq
    /// transport.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> KytClientBuilder {
        KytClientBuilder::default()
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn v1(&self) -> &V1Client {
        self.v1
            .get_or_init(|| V1Client::new(self.config.clone(), self.transport.clone()))
    }

    pub fn v2(&self) -> &V2Client {
        self.v2
            .get_or_init(|| V2Client::new(self.config.clone(), self.transport.clone()))
    }
}

/// Builder for `KytClient`.
///
/// Unset roots default to the public service; an unset transport defaults to
/// `UreqTransport`.
#[derive(Debug, Default)]
pub struct KytClientBuilder {
    api_key: String,
    base_url: Option<String>,
    admin_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl KytClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn admin_url(mut self, admin_url: impl Into<String>) -> Self {
        self.admin_url = Some(admin_url.into());
        self
    }

    /// Take the credential and both roots from a loaded configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.api_key = config.api_key;
        self.base_url = Some(config.base_url);
        self.admin_url = Some(config.admin_url);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> KytClient {
        let mut config = ClientConfig::new(self.api_key);
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(admin_url) = self.admin_url {
            config.admin_url = admin_url;
        }
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));
        KytClient {
            config: Arc::new(config),
            transport,
            v1: OnceLock::new(),
            v2: OnceLock::new(),
        }
    }
}
