//! Generation job entity, its DTOs and the terminal-commit description.

use grid_core::job_kind::JobKind;
use grid_core::lifecycle::{self, TerminalState};
use grid_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: EntityId,
    pub request_id: EntityId,
    pub worker_id: EntityId,
    #[sqlx(try_from = "String")]
    pub kind: JobKind,
    pub model: String,
    /// Quantity requested for this job.
    pub things: f64,
    /// Worker and requester belong to the same account.
    pub fake: bool,
    pub censored: bool,
    pub assigned_at: Timestamp,
    pub ttl_secs: i64,
    pub completed: bool,
    pub faulted: bool,
    pub cancelled: bool,
    pub current_step: i32,
    pub total_steps: i32,
    pub progress_percent: i16,
    pub progress_updated_at: Option<Timestamp>,
    /// Quantity produced.
    pub raw_things: f64,
    /// Reward credited on the terminal transition.
    pub reward: f64,
    #[serde(skip_serializing)]
    pub result: Option<String>,
    pub tags: Vec<String>,
    pub storage_locator: Option<String>,
    pub size_bytes: Option<i64>,
    pub abort_reason: Option<String>,
    pub finished_at: Option<Timestamp>,
}

impl GenerationJob {
    pub fn is_terminal(&self) -> bool {
        self.completed || self.faulted
    }

    pub fn terminal_state(&self) -> Option<TerminalState> {
        TerminalState::from_flags(self.completed, self.faulted, self.cancelled)
    }

    pub fn is_stale_at(&self, now: Timestamp) -> bool {
        lifecycle::is_stale(self.assigned_at, self.ttl_secs, self.is_terminal(), now)
    }

    /// Seconds since the job was handed to its worker.
    pub fn elapsed_secs(&self, now: Timestamp) -> f64 {
        (now - self.assigned_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Public view of the job, with time left estimated from `worker_speed`.
    pub fn details(&self, worker_speed: f64, now: Timestamp) -> JobDetails {
        let expected_seconds_left = if self.is_terminal() {
            0.0
        } else {
            lifecycle::expected_seconds_left(self.things, worker_speed, self.elapsed_secs(now))
        };

        JobDetails {
            id: self.id,
            request_id: self.request_id,
            worker_id: self.worker_id,
            kind: self.kind,
            model: self.model.clone(),
            status: match self.terminal_state() {
                None => "processing",
                Some(TerminalState::Completed) => "completed",
                Some(TerminalState::Faulted) => "faulted",
                Some(TerminalState::Cancelled) => "cancelled",
            },
            current_step: self.current_step,
            total_steps: self.total_steps,
            progress_percent: self.progress_percent,
            expected_seconds_left,
            stale: self.is_stale_at(now),
            reward: self.reward,
            censored: self.censored,
            tags: self.tags.clone(),
            storage_locator: self.storage_locator.clone(),
            size_bytes: self.size_bytes,
            assigned_at: self.assigned_at,
            finished_at: self.finished_at,
        }
    }
}

/// Job payload returned by the API and attached to notifications.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetails {
    pub id: EntityId,
    pub request_id: EntityId,
    pub worker_id: EntityId,
    pub kind: JobKind,
    pub model: String,
    pub status: &'static str,
    pub current_step: i32,
    pub total_steps: i32,
    pub progress_percent: i16,
    pub expected_seconds_left: f64,
    pub stale: bool,
    pub reward: f64,
    pub censored: bool,
    pub tags: Vec<String>,
    pub storage_locator: Option<String>,
    pub size_bytes: Option<i64>,
    pub assigned_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A job about to be handed to a worker.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: EntityId,
    pub request_id: EntityId,
    pub worker_id: EntityId,
    pub kind: JobKind,
    pub model: String,
    pub things: f64,
    pub fake: bool,
    pub assigned_at: Timestamp,
    pub ttl_secs: i64,
}

/// How a job leaves the pending state.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    Completed {
        result: String,
        tags: Vec<String>,
        storage_locator: Option<String>,
        size_bytes: Option<i64>,
        censored: bool,
    },
    Cancelled,
    Aborted {
        reason: String,
    },
}

impl TerminalOutcome {
    pub fn is_abort(&self) -> bool {
        matches!(self, TerminalOutcome::Aborted { .. })
    }
}

/// Everything one terminal transition writes, committed atomically.
///
/// The store re-checks the terminal guard under a row lock and writes the
/// job, the worker ledger, the request usage and the public totals together.
#[derive(Debug, Clone)]
pub struct TerminalCommit {
    pub job_id: EntityId,
    pub outcome: TerminalOutcome,
    pub raw_things: f64,
    /// Reward stored on the job and returned to the caller.
    pub reward: f64,
    /// Amount added to the worker's kudos ledger.
    pub worker_kudos: f64,
    /// Amount charged to the parent request.
    pub requester_kudos: f64,
    /// New worker throughput, when freshly measured.
    pub worker_speed: Option<f64>,
    /// Whether request usage and public totals are updated (false for fake jobs).
    pub count_public: bool,
    pub finished_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn job(assigned_at: Timestamp) -> GenerationJob {
        GenerationJob {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            worker_id: Uuid::new_v4(),
            kind: JobKind::Image,
            model: "Deliberate".into(),
            things: 100.0,
            fake: false,
            censored: false,
            assigned_at,
            ttl_secs: 60,
            completed: false,
            faulted: false,
            cancelled: false,
            current_step: 0,
            total_steps: 0,
            progress_percent: 0,
            progress_updated_at: None,
            raw_things: 0.0,
            reward: 0.0,
            result: None,
            tags: Vec::new(),
            storage_locator: None,
            size_bytes: None,
            abort_reason: None,
            finished_at: None,
        }
    }

    #[test]
    fn details_estimate_time_left() {
        let now = Utc::now();
        let j = job(now - Duration::seconds(4));
        let details = j.details(10.0, now);
        assert_eq!(details.status, "processing");
        assert!((details.expected_seconds_left - 6.0).abs() < 0.01);
        assert!(!details.stale);
    }

    #[test]
    fn terminal_job_reports_state_and_no_time_left() {
        let now = Utc::now();
        let mut j = job(now - Duration::seconds(600));
        j.faulted = true;
        j.cancelled = true;
        let details = j.details(10.0, now);
        assert_eq!(details.status, "cancelled");
        assert_eq!(details.expected_seconds_left, 0.0);
        assert!(!details.stale);
    }

    #[test]
    fn stale_after_ttl() {
        let now = Utc::now();
        assert!(job(now - Duration::seconds(61)).is_stale_at(now));
    }
}
