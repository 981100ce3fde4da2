//! Stale-job sweep.
//!
//! Jobs carry a TTL but no timer. A sweep lists the jobs whose TTL has
//! expired and aborts each through [`abort_job`], so worker stats and
//! notifications match a manual abort.

use grid_core::lifecycle::Transition;
use grid_core::types::Timestamp;
use grid_db::{JobStore, QueueStore};
use grid_events::Notifier;

use crate::error::LifecycleError;
use crate::service::abort_job;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Jobs found past their TTL.
    pub stale: usize,
    /// Jobs this sweep aborted.
    pub aborted: usize,
}

/// Abort every job whose TTL expired before `now`.
///
/// A job that turns terminal between the scan and its abort is skipped.
/// The first store failure stops the sweep.
pub async fn abort_stale_jobs(
    jobs: &dyn JobStore,
    queue: &dyn QueueStore,
    notifier: &Notifier,
    now: Timestamp,
) -> Result<SweepReport, LifecycleError> {
    let stale = queue.stale_jobs(now).await?;
    let mut report = SweepReport {
        stale: stale.len(),
        aborted: 0,
    };

    for job in stale {
        let reason = format!("Job exceeded its time-to-live of {}s", job.ttl_secs);
        if let Transition::Applied { .. } = abort_job(jobs, notifier, job.id, &reason).await? {
            report.aborted += 1;
        }
    }

    if report.stale > 0 {
        tracing::info!(stale = report.stale, aborted = report.aborted, "Stale job sweep finished");
    }
    Ok(report)
}
