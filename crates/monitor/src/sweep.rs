//! One monitoring pass over the job queue.

use chrono::Duration;
use grid_core::queue_health::{
    self, ModelBacklog, QueueHealth, QueueStats, ACTIVE_WORKER_WINDOW_MINUTES, ALERT_THRESHOLD,
    CLEANUP_THRESHOLD_MINUTES, STUCK_THRESHOLD_MINUTES,
};
use grid_core::types::Timestamp;
use grid_db::{JobStore, QueueStore};
use grid_events::{alerts, Notifier};
use grid_lifecycle::abort_stale_jobs;

use crate::error::MonitorError;

/// Thresholds and switches for a sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub stuck_minutes: i64,
    pub alert_threshold: usize,
    pub cleanup: bool,
    pub cleanup_age_minutes: i64,
    /// Send the stuck-jobs alert and the cleanup summary.
    pub alerts: bool,
    pub abort_stale: bool,
    pub report_health: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            stuck_minutes: STUCK_THRESHOLD_MINUTES,
            alert_threshold: ALERT_THRESHOLD,
            cleanup: false,
            cleanup_age_minutes: CLEANUP_THRESHOLD_MINUTES,
            alerts: true,
            abort_stale: false,
            report_health: false,
        }
    }
}

/// What a sweep found and did.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub stats: QueueStats,
    pub health: QueueHealth,
    pub stuck_by_model: Vec<ModelBacklog>,
    pub stuck_count: usize,
    pub oldest_minutes: f64,
    pub alert_threshold: usize,
    pub alert_sent: bool,
    /// Jobs aborted for exceeding their TTL.
    pub aborted: usize,
    /// `(jobs, requests)` deleted, when cleanup ran.
    pub cleaned: Option<(u64, u64)>,
}

impl SweepOutcome {
    pub fn threshold_crossed(&self) -> bool {
        queue_health::should_alert(self.stuck_count, self.alert_threshold)
    }

    /// Process exit code: 1 when the alert threshold was crossed.
    pub fn exit_code(&self) -> u8 {
        u8::from(self.threshold_crossed())
    }

    /// Human-readable summary. Empty in quiet mode when nothing is stuck.
    pub fn summary(&self, quiet: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if quiet && self.stuck_count == 0 {
            return lines;
        }

        lines.push(format!("Queue Status: {}", self.health.label()));
        lines.push(format!("  Active Workers: {}", self.stats.active_workers));
        lines.push(format!("  Processing: {}", self.stats.processing_count));
        lines.push(format!(
            "  Waiting Jobs: {} ({} images)",
            self.stats.waiting_count, self.stats.waiting_images
        ));
        lines.push(format!(
            "  Stuck Jobs: {} (oldest: {:.0} min)",
            self.stuck_count, self.oldest_minutes
        ));

        if self.threshold_crossed() {
            lines.push(format!("WARNING: {} stuck jobs detected!", self.stuck_count));
            for group in &self.stuck_by_model {
                lines.push(format!(
                    "    - {}: {} jobs ({:.0}m old)",
                    group.model, group.count, group.oldest_minutes
                ));
            }
        }
        if self.aborted > 0 {
            lines.push(format!("Aborted {} stale jobs", self.aborted));
        }
        if let Some((jobs, requests)) = self.cleaned {
            lines.push(format!("Cleaned: {jobs} jobs, {requests} requests"));
        }
        lines
    }
}

/// Run one sweep at `now`.
///
/// Idempotent apart from the optional abort and cleanup steps, which only
/// touch jobs that are still open.
pub async fn run_sweep(
    jobs: &dyn JobStore,
    queue: &dyn QueueStore,
    notifier: &Notifier,
    options: &SweepOptions,
    now: Timestamp,
) -> Result<SweepOutcome, MonitorError> {
    let cutoff = now - Duration::minutes(options.stuck_minutes);
    let stuck_by_model = queue.stuck_jobs_by_model(cutoff, now).await?;
    let (stuck_count, oldest_minutes) = queue_health::summarize(&stuck_by_model);

    let active_since = now - Duration::minutes(ACTIVE_WORKER_WINDOW_MINUTES);
    let stats = queue.queue_stats(active_since).await?;
    let health = QueueHealth::classify(&stats, stuck_count);

    tracing::info!(
        health = health.label(),
        stuck = stuck_count,
        oldest_minutes,
        processing = stats.processing_count,
        waiting = stats.waiting_count,
        active_workers = stats.active_workers,
        "Queue sweep"
    );

    let mut outcome = SweepOutcome {
        stats,
        health,
        stuck_by_model,
        stuck_count,
        oldest_minutes,
        alert_threshold: options.alert_threshold,
        alert_sent: false,
        aborted: 0,
        cleaned: None,
    };

    if outcome.threshold_crossed() {
        tracing::warn!(
            stuck = stuck_count,
            threshold = options.alert_threshold,
            "Stuck jobs over threshold"
        );
        if options.alerts {
            notifier.notify(alerts::stuck_jobs(&outcome.stuck_by_model, options.stuck_minutes));
            outcome.alert_sent = true;
        }
    }

    if options.report_health && options.alerts {
        notifier.notify(alerts::queue_health(health, &outcome.stats, stuck_count));
    }

    if options.abort_stale {
        let report = abort_stale_jobs(jobs, queue, notifier, now).await?;
        outcome.aborted = report.aborted;
    }

    if options.cleanup && stuck_count > 0 {
        let age_cutoff = now - Duration::minutes(options.cleanup_age_minutes);
        let jobs_deleted = queue.delete_jobs_before(age_cutoff).await?;
        let requests_deleted = queue.delete_orphaned_requests().await?;
        tracing::info!(
            jobs = jobs_deleted,
            requests = requests_deleted,
            age_minutes = options.cleanup_age_minutes,
            "Queue cleanup"
        );
        if options.alerts && (jobs_deleted > 0 || requests_deleted > 0) {
            notifier.notify(alerts::queue_cleaned(
                jobs_deleted,
                requests_deleted,
                options.cleanup_age_minutes,
            ));
        }
        outcome.cleaned = Some((jobs_deleted, requests_deleted));
    }

    Ok(outcome)
}
