//! Generation job lifecycle service.
//!
//! [`JobLifecycle`] drives a job from assignment to one of its terminal
//! states. Every terminal transition is committed through the
//! [`grid_db::JobStore`] before the reward is returned, and repeated
//! transitions resolve to [`grid_core::lifecycle::Transition::AlreadyTerminal`].

pub mod config;
pub mod error;
pub mod service;
pub mod sweep;

pub use config::LifecycleConfig;
pub use error::LifecycleError;
pub use service::{abort_job, JobLifecycle, ResultReport};
pub use sweep::{abort_stale_jobs, SweepReport};
