//! Client configuration.

use std::fmt;

use serde::Deserialize;

/// Root for every resource endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.chainalysis.com/api/kyt";

/// Root for organization administration endpoints.
pub const DEFAULT_ADMIN_URL: &str = "https://api.chainalysis.com/admin";

/// Credential and service roots shared by every client built from it.
///
/// Deserializes from any serde format; both URLs fall back to the public
/// service roots when absent. `Debug` output never includes the API key.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            admin_url: default_admin_url(),
        }
    }

    /// The root for a call: the admin root when `admin` is set.
    pub fn root(&self, admin: bool) -> &str {
        if admin {
            &self.admin_url
        } else {
            &self.base_url
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("admin_url", &self.admin_url)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_admin_url() -> String {
    DEFAULT_ADMIN_URL.to_string()
}
