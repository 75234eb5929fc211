//! Remote content store configuration.
//!
//! The HTTP backend talks to a content-addressed blob gateway. Point it at a
//! local mock for testing by constructing [`HttpStoreConfig`] directly.

use url::Url;

/// Connection settings for [`HttpContentStore`](crate::HttpContentStore).
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the blob gateway. Requests go to `{base_url}/v1/blobs/{hex}`.
    pub base_url: Url,
    /// Optional bearer token sent on every request.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HttpStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoreConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpStoreConfig {
    /// Build a config for `base_url` with no token and the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `CERTREG_STORE_URL` is unset, meaning no
    /// remote store is configured.
    ///
    /// Variables:
    /// - `CERTREG_STORE_URL`
    /// - `CERTREG_STORE_TOKEN` (optional)
    /// - `CERTREG_STORE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(raw) = std::env::var("CERTREG_STORE_URL") else {
            return Ok(None);
        };
        let timeout_secs = match std::env::var("CERTREG_STORE_TIMEOUT_SECS") {
            Ok(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("CERTREG_STORE_TIMEOUT_SECS".into(), s))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Some(Self {
            base_url: parse_url("CERTREG_STORE_URL", &raw)?,
            api_token: std::env::var("CERTREG_STORE_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs,
        }))
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
