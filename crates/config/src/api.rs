//! HTTP API configuration

use serde::Deserialize;

/// HTTP API configuration
///
/// # Example
///
/// ```toml
/// [api]
/// address = "127.0.0.1"
/// port = 2501
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Whether the HTTP API is served
    /// Default: true
    pub enabled: bool,

    /// Bind address
    /// Default: "127.0.0.1"
    pub address: String,

    /// Listen port
    /// Default: 2501
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".into(),
            port: 2501,
        }
    }
}

impl ApiConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
