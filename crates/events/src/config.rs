use std::collections::HashMap;
use std::time::Duration;

use grid_core::channels::{CHANNEL_CORE, CHANNEL_GENERATION, CHANNEL_JOBS};

/// Default queue capacity between producers and the delivery task.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default timeout for one webhook POST.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Notification configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Channel name to webhook URL. Channels without an entry are disabled.
    pub webhooks: HashMap<String, String>,
    pub queue_capacity: usize,
    pub timeout: Duration,
}

impl NotifyConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default            |
    /// |-----------------------------|--------------------|
    /// | `NOTIFY_CORE_WEBHOOK`       | unset (disabled)   |
    /// | `NOTIFY_JOBS_WEBHOOK`       | unset (disabled)   |
    /// | `NOTIFY_GENERATION_WEBHOOK` | unset (disabled)   |
    /// | `NOTIFY_QUEUE_CAPACITY`     | `1024`             |
    /// | `NOTIFY_TIMEOUT_SECS`       | `5`                |
    pub fn from_env() -> Self {
        let mut webhooks = HashMap::new();
        for (channel, var) in [
            (CHANNEL_CORE, "NOTIFY_CORE_WEBHOOK"),
            (CHANNEL_JOBS, "NOTIFY_JOBS_WEBHOOK"),
            (CHANNEL_GENERATION, "NOTIFY_GENERATION_WEBHOOK"),
        ] {
            if let Some(url) = std::env::var(var).ok().filter(|u| !u.trim().is_empty()) {
                webhooks.insert(channel.to_string(), url.trim().to_string());
            }
        }

        let queue_capacity = std::env::var("NOTIFY_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let timeout_secs = std::env::var("NOTIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            webhooks,
            queue_capacity,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhooks: HashMap::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
