//! Well-known notification destination names.
//!
//! Each name maps to one operator-configured webhook in the dispatcher
//! configuration. A destination with no webhook configured is disabled and
//! its events are dropped by the sink.

/// Operational log: worker aborts, queue alerts, cleanups, health reports.
pub const CHANNEL_CORE: &str = "core";

/// Job activity: jobs handed to workers.
pub const CHANNEL_JOBS: &str = "jobs";

/// Completed generations with their rewards. Noisy; usually left unconfigured.
pub const CHANNEL_GENERATION: &str = "generation";

/// All destinations, in configuration order.
pub const ALL_CHANNELS: [&str; 3] = [CHANNEL_CORE, CHANNEL_JOBS, CHANNEL_GENERATION];
