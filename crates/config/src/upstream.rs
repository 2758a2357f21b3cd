//! Upstream Copilot endpoint configuration.

use secrecy::SecretString;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.githubcopilot.com";

/// Connection settings for the upstream Copilot-compatible backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API.
    pub base_url: String,

    /// Bearer token sent to the upstream. Token acquisition and refresh
    /// happen outside the gateway; this is the already-valid value.
    pub token: Option<SecretString>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
        }
    }
}
