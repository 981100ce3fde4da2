//! Queue health classification for the stuck-job monitor.
//!
//! The stuck threshold here is an early-warning signal and is independent
//! of (and much shorter than) the per-job TTL in [`crate::lifecycle`].

use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Jobs older than this many minutes count as stuck.
pub const STUCK_THRESHOLD_MINUTES: i64 = 10;

/// Minimum stuck-job count before an alert is sent.
pub const ALERT_THRESHOLD: usize = 5;

/// Cleanup deletes jobs older than this many minutes.
pub const CLEANUP_THRESHOLD_MINUTES: i64 = 30;

/// A worker that checked in within this many minutes counts as active.
pub const ACTIVE_WORKER_WINDOW_MINUTES: i64 = 5;

/// Processing count above this multiple of the waiting count is a warning.
pub const PROCESSING_TO_WAITING_RATIO: u64 = 2;

/// Number of model groups listed in an alert before summarising the rest.
pub const ALERT_MODEL_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Stuck jobs for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelBacklog {
    pub model: String,
    pub count: usize,
    /// Age of the oldest job in the group, in minutes.
    pub oldest_minutes: f64,
}

/// Queue-wide counters collected by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Non-terminal jobs currently assigned to workers.
    pub processing_count: u64,
    /// Requests still wanting output.
    pub waiting_count: u64,
    /// Outputs still wanted across waiting requests.
    pub waiting_images: u64,
    pub active_workers: u64,
}

/// Overall queue health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueHealth {
    Healthy,
    /// Processing count is disproportionate to the backlog.
    Warning,
    /// At least one stuck job is present.
    Unhealthy,
}

impl QueueHealth {
    /// Classify health from queue counters and the stuck-job count.
    pub fn classify(stats: &QueueStats, stuck_count: usize) -> Self {
        if stuck_count > 0 {
            QueueHealth::Unhealthy
        } else if stats.processing_count > stats.waiting_count * PROCESSING_TO_WAITING_RATIO {
            QueueHealth::Warning
        } else {
            QueueHealth::Healthy
        }
    }

    /// Embed colour used by notifications.
    pub fn color(&self) -> u32 {
        match self {
            QueueHealth::Healthy => 0x00FF00,
            QueueHealth::Warning => 0xFFA500,
            QueueHealth::Unhealthy => 0xFF0000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueueHealth::Healthy => "HEALTHY",
            QueueHealth::Warning => "WARNING",
            QueueHealth::Unhealthy => "UNHEALTHY",
        }
    }
}

/// Total stuck jobs and the oldest age across groups.
pub fn summarize(groups: &[ModelBacklog]) -> (usize, f64) {
    groups.iter().fold((0, 0.0_f64), |(total, oldest), g| {
        (total + g.count, oldest.max(g.oldest_minutes))
    })
}

/// Whether a stuck count warrants an alert.
pub fn should_alert(stuck_count: usize, threshold: usize) -> bool {
    stuck_count >= threshold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
