//! Builders for every notification the services emit.

use std::fmt::Display;

use grid_core::channels::{CHANNEL_CORE, CHANNEL_GENERATION, CHANNEL_JOBS};
use grid_core::job_kind::JobKind;
use grid_core::queue_health::{self, ModelBacklog, QueueHealth, QueueStats, ALERT_MODEL_LIMIT};

use crate::event::NotificationEvent;

/// Abort reasons longer than this many characters are cut.
pub const ABORT_REASON_LIMIT: usize = 1000;

const FOOTER: &str = "grid";

const GREEN: u32 = 0x00FF00;
const BLUE: u32 = 0x3498DB;
const ORANGE: u32 = 0xFFA500;
const RED: u32 = 0xFF0000;

pub const TITLE_JOB_POPPED: &str = "Job Popped";
pub const TITLE_JOB_COMPLETED: &str = "Job Completed";
pub const TITLE_JOB_CANCELLED: &str = "Job Cancelled";
pub const TITLE_JOB_ABORTED: &str = "Job Aborted";
pub const TITLE_STUCK_JOBS: &str = "Stuck Jobs Detected";
pub const TITLE_QUEUE_CLEANED: &str = "Queue Cleaned";
pub const TITLE_QUEUE_HEALTH: &str = "Queue Health";

/// A job was handed to a worker.
pub fn job_popped(
    job_id: impl Display,
    worker_name: &str,
    model: &str,
    kind: JobKind,
) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_JOBS, TITLE_JOB_POPPED)
        .with_color(BLUE)
        .with_field("Job", job_id, false)
        .with_field("Worker", worker_name, true)
        .with_field("Model", model, true)
        .with_field("Kind", kind, true)
        .with_footer(FOOTER)
}

/// A job finished and its reward was committed.
pub fn job_completed(
    job_id: impl Display,
    worker_name: &str,
    model: &str,
    reward: f64,
    raw_things: f64,
) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_GENERATION, TITLE_JOB_COMPLETED)
        .with_color(GREEN)
        .with_field("Job", job_id, false)
        .with_field("Worker", worker_name, true)
        .with_field("Model", model, true)
        .with_field("Reward", format!("{reward:.2}"), true)
        .with_field("Things", format!("{raw_things:.0}"), true)
        .with_footer(FOOTER)
}

/// A job was cancelled; partial work was paid.
pub fn job_cancelled(
    job_id: impl Display,
    worker_name: &str,
    model: &str,
    reward: f64,
) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_JOBS, TITLE_JOB_CANCELLED)
        .with_color(ORANGE)
        .with_field("Job", job_id, false)
        .with_field("Worker", worker_name, true)
        .with_field("Model", model, true)
        .with_field("Reward", format!("{reward:.2}"), true)
        .with_footer(FOOTER)
}

/// A job was aborted without reward.
pub fn job_aborted(
    job_id: impl Display,
    worker_name: &str,
    model: &str,
    reason: &str,
) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_CORE, TITLE_JOB_ABORTED)
        .with_color(RED)
        .with_description(truncate_chars(reason, ABORT_REASON_LIMIT))
        .with_field("Job", job_id, false)
        .with_field("Worker", worker_name, true)
        .with_field("Model", model, true)
        .with_footer(FOOTER)
}

/// Stuck jobs crossed the alert threshold.
///
/// Lists the largest groups first and summarises the rest.
pub fn stuck_jobs(groups: &[ModelBacklog], stuck_minutes: i64) -> NotificationEvent {
    let (total, oldest) = queue_health::summarize(groups);

    let mut event = NotificationEvent::new(CHANNEL_CORE, TITLE_STUCK_JOBS)
        .with_color(RED)
        .with_description(format!(
            "{total} jobs stuck for more than {stuck_minutes} minutes (oldest {oldest:.1} min)"
        ));

    for group in groups.iter().take(ALERT_MODEL_LIMIT) {
        event = event.with_field(
            group.model.as_str(),
            format!("{} jobs, oldest {:.1} min", group.count, group.oldest_minutes),
            false,
        );
    }
    if groups.len() > ALERT_MODEL_LIMIT {
        event = event.with_field(
            "Other models",
            format!("... and {} more", groups.len() - ALERT_MODEL_LIMIT),
            false,
        );
    }

    event.with_field("Total", total, true).with_footer(FOOTER)
}

/// Cleanup removed old jobs and orphaned requests.
pub fn queue_cleaned(jobs_deleted: u64, requests_deleted: u64, age_minutes: i64) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_CORE, TITLE_QUEUE_CLEANED)
        .with_color(ORANGE)
        .with_description(format!("Removed jobs older than {age_minutes} minutes"))
        .with_field("Jobs deleted", jobs_deleted, true)
        .with_field("Requests deleted", requests_deleted, true)
        .with_footer(FOOTER)
}

/// Periodic health summary.
pub fn queue_health(health: QueueHealth, stats: &QueueStats, stuck_count: usize) -> NotificationEvent {
    NotificationEvent::new(CHANNEL_CORE, TITLE_QUEUE_HEALTH)
        .with_color(health.color())
        .with_description(format!("Status: {}", health.label()))
        .with_field("Processing", stats.processing_count, true)
        .with_field("Waiting requests", stats.waiting_count, true)
        .with_field("Waiting images", stats.waiting_images, true)
        .with_field("Active workers", stats.active_workers, true)
        .with_field("Stuck", stuck_count, true)
        .with_footer(FOOTER)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
