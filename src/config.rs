//! Gateway endpoint configuration.
//!
//! Environment variables are used as initial defaults; callers embedding the
//! core can override programmatically. Process startup itself is out of scope.

/// Environment variable holding the verification service base URL.
pub const GATEWAY_URL_ENV: &str = "STEPWISE_GATEWAY_URL";

const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8787";

/// Where the remote verification service lives.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL; trailing slashes are tolerated.
    pub base_url: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Read the base URL from `STEPWISE_GATEWAY_URL`, falling back to the
    /// local default when unset or blank.
    pub fn from_env() -> Self {
        let base_url = std::env::var(GATEWAY_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        Self { base_url }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY_URL)
    }
}
