use grid_core::lifecycle::DEFAULT_JOB_TTL_SECS;

/// Lifecycle configuration.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Time-to-live stamped on every new job, in seconds.
    pub ttl_secs: i64,
}

impl LifecycleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default |
    /// |----------------|---------|
    /// | `JOB_TTL_SECS` | `86400` |
    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("JOB_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|s: &i64| *s >= 0)
            .unwrap_or(DEFAULT_JOB_TTL_SECS);
        Self { ttl_secs }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_JOB_TTL_SECS,
        }
    }
}
