//! Client configuration
//!
//! Every field has a default matching the production provider, so an empty
//! `[client]` table (or none at all) is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// OAuth scopes the developer account must have granted.
///
/// Not enforced by the client; a token without them is answered with
/// 401/403 by the provider.
pub const REQUIRED_SCOPES: [&str; 5] = [
    "mb:vehicle:mbdata:vehiclestatus",
    "mb:vehicle:mbdata:fuelstatus",
    "mb:vehicle:mbdata:payasyoudrive",
    "mb:vehicle:mbdata:vehiclelock",
    "mb:vehicle:mbdata:evstatus",
];

/// Configuration for a Mercedes vehicle data session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the OAuth server
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Base URL of the vehicle data API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Default request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for single resource fetches (defaults to half the request timeout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_timeout_secs: Option<u64>,
    /// Timeout for the resource listing used as awake check
    #[serde(default = "default_awake_timeout")]
    pub awake_timeout_secs: u64,
    /// Attempts for the resource listing before giving up
    #[serde(default = "default_awake_attempts")]
    pub awake_attempts: u32,
    /// Resource schema version the field parser was written against
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_auth_url() -> String {
    "https://api.secure.mercedes-benz.com".to_string()
}

fn default_api_url() -> String {
    "https://api.mercedes-benz.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_awake_timeout() -> u64 {
    10
}

fn default_awake_attempts() -> u32 {
    4
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_request_timeout(),
            resource_timeout_secs: None,
            awake_timeout_secs: default_awake_timeout(),
            awake_attempts: default_awake_attempts(),
            schema_version: default_schema_version(),
        }
    }
}

impl ClientConfig {
    /// Point both the OAuth and the data API at one base URL (mock servers)
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            auth_url: base_url.to_string(),
            api_url: base_url.to_string(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn resource_timeout(&self) -> Duration {
        match self.resource_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.request_timeout() / 2,
        }
    }

    pub fn awake_timeout(&self) -> Duration {
        Duration::from_secs(self.awake_timeout_secs)
    }
}
