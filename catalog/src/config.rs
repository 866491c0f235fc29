//! Client configuration.
//!
//! Values are provided by the application. [`ClientConfig::from_env`] overlays
//! the `CATALOG_*` environment variables on the defaults.

use crate::error::ConfigError;
use catalog_sync_runtime::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Remote base URL variable.
pub const ENV_BASE_URL: &str = "CATALOG_BASE_URL";
/// HTTP request timeout variable, in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "CATALOG_TIMEOUT_SECS";
/// Token file variable. An empty value disables token persistence.
pub const ENV_TOKEN_PATH: &str = "CATALOG_TOKEN_PATH";

/// Catalog client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote catalog and auth base URL.
    ///
    /// Default: `https://dummyjson.com`
    pub base_url: String,

    /// Timeout for each HTTP request. This is the only timeout on remote
    /// calls; the engine itself never cancels one.
    ///
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// How long the dispatcher waits for an operation to settle before
    /// giving up on it. The operation keeps running and still settles into
    /// state.
    ///
    /// Default: 30 seconds
    pub settle_timeout: Duration,

    /// Token file, or `None` to keep the token in memory.
    ///
    /// Default: `.catalog-token`
    pub token_path: Option<PathBuf>,

    /// Settled actions buffered for action observers; waiters are unbounded.
    ///
    /// Default: 64
    pub broadcast_capacity: usize,

    /// Graceful shutdown timeout.
    ///
    /// Default: 10 seconds
    pub shutdown_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for `base_url` with default values otherwise.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load defaults overlaid with the `CATALOG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load defaults overlaid with the values `lookup` returns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    var: ENV_BASE_URL,
                    value: url,
                    reason: "expected an http:// or https:// URL".to_string(),
                });
            }
            config.base_url = url;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: ENV_TIMEOUT_SECS,
                    value: secs.clone(),
                    reason: "expected a positive number of seconds".to_string(),
                })?;
            config.request_timeout = Duration::from_secs(parsed);
        }

        if let Some(path) = lookup(ENV_TOKEN_PATH) {
            config.token_path = (!path.trim().is_empty()).then(|| PathBuf::from(path));
        }

        Ok(config)
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the HTTP request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how long the dispatcher waits for an operation to settle.
    #[must_use]
    pub const fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Persist the token at `path`.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Keep the token in memory only.
    #[must_use]
    pub fn without_token_persistence(mut self) -> Self {
        self.token_path = None;
        self
    }

    /// Set the broadcast capacity.
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the shutdown timeout.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Store runtime configuration derived from this one.
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dummyjson.com".to_string(),
            request_timeout: Duration::from_secs(10),
            settle_timeout: Duration::from_secs(30),
            token_path: Some(PathBuf::from(".catalog-token")),
            broadcast_capacity: 64,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}
