//! Queue health monitor.
//!
//! One [`sweep::run_sweep`] call is a stateless pass over persisted job
//! state: group stuck jobs by model, classify queue health, alert when the
//! stuck count reaches the threshold, and optionally abort stale jobs and
//! delete old ones. The `grid-monitor` binary runs a single sweep and exits
//! non-zero when the alert threshold was crossed.

pub mod cli;
pub mod error;
pub mod sweep;

pub use cli::MonitorArgs;
pub use error::MonitorError;
pub use sweep::{run_sweep, SweepOptions, SweepOutcome};
