use std::path::PathBuf;
use std::time::Duration;

use crate::client::FetchPolicy;

/// Default registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8545/registry";

/// Default registry address recorded in snapshot files.
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x79F39f2a0eA476f53994812e6a8f3C8CFe08c609";

/// Default snapshot file location.
pub const DEFAULT_CACHE_PATH: &str = "model_cache.json";

/// Default refresh period: one hour.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Default pause between record fetches.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 200;

/// Timeout for a single registry HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Model resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub registry_url: String,
    pub registry_address: String,
    /// Snapshot file written after each successful live refresh.
    pub cache_path: PathBuf,
    /// Fallback dataset on disk; the bundled dataset when `None`.
    pub fallback_path: Option<PathBuf>,
    pub refresh_interval: Duration,
    pub fetch: FetchPolicy,
}

impl ResolverConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                          |
    /// |-----------------------------------|----------------------------------|
    /// | `MODEL_REGISTRY_URL`              | `http://localhost:8545/registry` |
    /// | `MODEL_REGISTRY_ADDRESS`          | `0x79F3...c609`                  |
    /// | `MODEL_CACHE_PATH`                | `model_cache.json`               |
    /// | `MODEL_FALLBACK_PATH`             | unset (bundled dataset)          |
    /// | `MODEL_REFRESH_INTERVAL_SECS`     | `3600`                           |
    /// | `MODEL_REGISTRY_REQUEST_DELAY_MS` | `200`                            |
    pub fn from_env() -> Self {
        let registry_url =
            std::env::var("MODEL_REGISTRY_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.into());
        let registry_address = std::env::var("MODEL_REGISTRY_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_REGISTRY_ADDRESS.into());
        let cache_path = std::env::var("MODEL_CACHE_PATH")
            .unwrap_or_else(|_| DEFAULT_CACHE_PATH.into())
            .into();
        let fallback_path = std::env::var("MODEL_FALLBACK_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let refresh_secs = std::env::var("MODEL_REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|s: &u64| *s > 0)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        let delay_ms = std::env::var("MODEL_REGISTRY_REQUEST_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_DELAY_MS);

        Self {
            registry_url,
            registry_address,
            cache_path,
            fallback_path,
            refresh_interval: Duration::from_secs(refresh_secs),
            fetch: FetchPolicy {
                request_delay: Duration::from_millis(delay_ms),
                ..FetchPolicy::default()
            },
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.into(),
            registry_address: DEFAULT_REGISTRY_ADDRESS.into(),
            cache_path: DEFAULT_CACHE_PATH.into(),
            fallback_path: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            fetch: FetchPolicy::default(),
        }
    }
}
