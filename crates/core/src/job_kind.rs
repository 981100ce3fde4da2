//! Job kind discriminator and per-kind reward capability.
//!
//! Every generation job carries a [`JobKind`]. The kind decides how the
//! produced quantity ("things") is measured from a result and therefore how
//! much of the request's priced reward a job earns. Image and video jobs are
//! measured in the steps the request asked for; text jobs are measured by
//! the tokens actually returned, since a model may stop early on EOS.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Media discriminator for a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Video,
    Text,
}

impl JobKind {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Image => "image",
            JobKind::Video => "video",
            JobKind::Text => "text",
        }
    }

    /// Parse the stored representation.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "image" => Ok(JobKind::Image),
            "video" => Ok(JobKind::Video),
            "text" => Ok(JobKind::Text),
            other => Err(CoreError::Validation(format!("Unknown job kind: {other}"))),
        }
    }

    /// Quantity actually produced by a job.
    ///
    /// `payload` is `None` when the job ended without a result (cancellation);
    /// the requested quantity is then assumed, since partial work is paid.
    pub fn produced_things(&self, requested_things: f64, payload: Option<&str>) -> f64 {
        let requested = requested_things.max(0.0);
        match (self, payload) {
            (JobKind::Text, Some(text)) => {
                let tokens = text.split_whitespace().count() as f64;
                tokens.min(requested)
            }
            _ => requested,
        }
    }
}

impl TryFrom<String> for JobKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JobKind::parse(&value)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the reward function for one job.
#[derive(Debug, Clone, Copy)]
pub struct RewardInput {
    /// Quantity the job produced (see [`JobKind::produced_things`]).
    pub raw_things: f64,
    /// Quantity the parent request asked for per job.
    pub request_things: f64,
    /// Reward the parent request was priced at per job.
    pub request_kudos: f64,
}

/// Compute the reward for a job.
///
/// The priced request reward is scaled by the fraction of the requested
/// quantity that was produced. The result is never negative and never NaN.
pub fn compute_reward(input: RewardInput) -> f64 {
    let base = input.request_kudos.max(0.0);
    let reward = if input.request_things > 0.0 {
        base * (input.raw_things / input.request_things).clamp(0.0, 1.0)
    } else {
        base
    };
    if reward.is_finite() {
        reward
    } else {
        0.0
    }
}

/// Requester-visible share of a reward. Censored results cost the requester
/// nothing; the worker side is unaffected.
pub fn requester_kudos(reward: f64, censored: bool) -> f64 {
    if censored {
        0.0
    } else {
        reward
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
