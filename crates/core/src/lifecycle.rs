//! Generation job lifecycle rules.
//!
//! Pure functions behind the job state machine: staleness, progress
//! percentages, payload sanitisation, model selection and the sentinel
//! returned when an operation hits an already-terminal job. The stateful
//! service that applies these lives in `grid-lifecycle`.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default time-to-live for an assigned job, in seconds (24 hours).
///
/// Deliberately generous: jobs run as long as they need and are only
/// reaped by an explicit abort. Unrelated to the queue monitor's stuck
/// threshold.
pub const DEFAULT_JOB_TTL_SECS: i64 = 86_400;

/// Replacement for characters that must not reach storage.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

// ---------------------------------------------------------------------------
// Terminal states and transition outcomes
// ---------------------------------------------------------------------------

/// Terminal state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    Completed,
    /// Aborted or errored without a reward.
    Faulted,
    /// Faulted at the owner's request; partial work was rewarded.
    Cancelled,
}

impl TerminalState {
    /// Derive the terminal state from a job's flags, if any.
    pub fn from_flags(completed: bool, faulted: bool, cancelled: bool) -> Option<Self> {
        match (completed, faulted, cancelled) {
            (true, _, _) => Some(TerminalState::Completed),
            (false, true, true) => Some(TerminalState::Cancelled),
            (false, true, false) => Some(TerminalState::Faulted),
            _ => None,
        }
    }
}

/// Result of a terminal operation (report, cancel, abort).
///
/// Hitting a job that is already terminal is expected (workers retry) and
/// is reported as [`Transition::AlreadyTerminal`] rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// The transition was committed and `reward` was credited.
    Applied { reward: f64 },
    /// The job was already terminal; nothing changed.
    AlreadyTerminal { state: TerminalState },
}

impl Transition {
    /// Credited reward, or `None` for the no-op sentinel.
    pub fn reward(&self) -> Option<f64> {
        match self {
            Transition::Applied { reward } => Some(*reward),
            Transition::AlreadyTerminal { .. } => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// Staleness and progress
// ---------------------------------------------------------------------------

/// A job is stale when it is not terminal and more than `ttl_secs` have
/// elapsed since it was assigned.
pub fn is_stale(assigned_at: Timestamp, ttl_secs: i64, terminal: bool, now: Timestamp) -> bool {
    if terminal {
        return false;
    }
    now - assigned_at > chrono::Duration::seconds(ttl_secs)
}

/// Progress percentage: `floor(100 * step / max(total, 1))`, clamped to
/// `0..=100`.
pub fn progress_percent(current_step: i32, total_steps: i32) -> i16 {
    let step = i64::from(current_step.max(0));
    let total = i64::from(total_steps.max(1));
    ((100 * step) / total).clamp(0, 100) as i16
}

/// Seconds a job is still expected to run, floored at zero.
///
/// Uses the worker's measured throughput; a worker with no measurement is
/// assumed to be done.
pub fn expected_seconds_left(things: f64, things_per_sec: f64, elapsed_secs: f64) -> f64 {
    if things_per_sec <= 0.0 {
        return 0.0;
    }
    (things / things_per_sec - elapsed_secs).max(0.0)
}

/// Blend a fresh throughput measurement into a worker's stored speed.
///
/// Returns the stored speed unchanged when the measurement is unusable.
pub fn blend_speed(stored: f64, raw_things: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 || raw_things <= 0.0 {
        return stored;
    }
    let measured = raw_things / elapsed_secs;
    if stored > 0.0 {
        (stored + measured) / 2.0
    } else {
        measured
    }
}

// ---------------------------------------------------------------------------
// Sanitisation
// ---------------------------------------------------------------------------

/// Replace control characters (NUL included) with U+FFFD.
///
/// Line breaks and tabs are kept since text results legitimately carry them.
pub fn sanitize_payload(payload: &str) -> String {
    payload
        .chars()
        .map(|c| {
            if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
                REPLACEMENT_CHAR
            } else {
                c
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Pick the model a new job will run.
///
/// Candidates are the worker's models that the request asked for. A request
/// with no preference, or one sharing nothing with the worker, falls back to
/// all of the worker's models. The choice among candidates is uniformly
/// random to spread load. Returns `None` only if the worker has no models.
pub fn select_model<R: Rng + ?Sized>(
    worker_models: &[String],
    request_models: &[String],
    rng: &mut R,
) -> Option<String> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<&String> = if request_models.is_empty() {
        Vec::new()
    } else {
        request_models
            .iter()
            .filter(|m| worker_models.contains(*m) && seen.insert(m.as_str()))
            .collect()
    };

    if candidates.is_empty() {
        seen.clear();
        candidates = worker_models
            .iter()
            .filter(|m| seen.insert(m.as_str()))
            .collect();
    }

    candidates.choose(rng).map(|m| (*m).clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // -- terminal state -------------------------------------------------------

    #[test]
    fn terminal_state_from_flags() {
        assert_eq!(TerminalState::from_flags(false, false, false), None);
        assert_eq!(
            TerminalState::from_flags(true, false, false),
            Some(TerminalState::Completed)
        );
        assert_eq!(
            TerminalState::from_flags(false, true, false),
            Some(TerminalState::Faulted)
        );
        assert_eq!(
            TerminalState::from_flags(false, true, true),
            Some(TerminalState::Cancelled)
        );
    }

    #[test]
    fn sentinel_has_no_reward() {
        let t = Transition::AlreadyTerminal {
            state: TerminalState::Completed,
        };
        assert_eq!(t.reward(), None);
        assert!(!t.is_applied());
        assert_eq!(Transition::Applied { reward: 2.0 }.reward(), Some(2.0));
    }

    // -- is_stale -------------------------------------------------------------

    #[test]
    fn fresh_job_is_not_stale() {
        let now = Utc::now();
        assert!(!is_stale(now - Duration::seconds(10), 60, false, now));
    }

    #[test]
    fn job_past_ttl_is_stale() {
        let now = Utc::now();
        assert!(is_stale(now - Duration::seconds(61), 60, false, now));
    }

    #[test]
    fn exactly_at_ttl_is_not_stale() {
        let now = Utc::now();
        assert!(!is_stale(now - Duration::seconds(60), 60, false, now));
    }

    #[test]
    fn terminal_job_is_never_stale() {
        let now = Utc::now();
        assert!(!is_stale(now - Duration::days(30), 60, true, now));
    }

    // -- progress_percent -----------------------------------------------------

    #[test]
    fn progress_floors() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 66);
    }

    #[test]
    fn progress_with_zero_total_uses_one() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 0), 100);
    }

    #[test]
    fn progress_clamped() {
        assert_eq!(progress_percent(30, 20), 100);
        assert_eq!(progress_percent(-5, 20), 0);
    }

    // -- expected_seconds_left ------------------------------------------------

    #[test]
    fn expected_time_left_floors_at_zero() {
        assert_eq!(expected_seconds_left(100.0, 10.0, 4.0), 6.0);
        assert_eq!(expected_seconds_left(100.0, 10.0, 40.0), 0.0);
        assert_eq!(expected_seconds_left(100.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn speed_blending() {
        assert_eq!(blend_speed(0.0, 100.0, 10.0), 10.0);
        assert_eq!(blend_speed(20.0, 100.0, 10.0), 15.0);
        assert_eq!(blend_speed(20.0, 100.0, 0.0), 20.0);
    }

    // -- sanitize_payload -----------------------------------------------------

    #[test]
    fn nul_and_control_chars_replaced() {
        let clean = sanitize_payload("a\u{0}b\u{7}c");
        assert_eq!(clean, "a\u{FFFD}b\u{FFFD}c");
    }

    #[test]
    fn whitespace_controls_kept() {
        assert_eq!(sanitize_payload("line\nnext\ttab\r"), "line\nnext\ttab\r");
    }

    // -- select_model ---------------------------------------------------------

    #[test]
    fn single_intersection_is_chosen() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let model = select_model(&names(&["A", "B"]), &names(&["B", "C"]), &mut rng);
            assert_eq!(model.as_deref(), Some("B"));
        }
    }

    #[test]
    fn no_preference_draws_from_worker_models() {
        let mut rng = rand::rng();
        let worker = names(&["A", "B"]);
        for _ in 0..20 {
            let model = select_model(&worker, &[], &mut rng).unwrap();
            assert!(worker.contains(&model));
        }
    }

    #[test]
    fn empty_intersection_falls_back_to_worker_models() {
        let mut rng = rand::rng();
        let worker = names(&["A", "B"]);
        let model = select_model(&worker, &names(&["Z"]), &mut rng).unwrap();
        assert!(worker.contains(&model));
    }

    #[test]
    fn worker_without_models_yields_none() {
        let mut rng = rand::rng();
        assert_eq!(select_model(&[], &names(&["A"]), &mut rng), None);
    }
}
