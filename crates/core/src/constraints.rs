//! Per-model generation parameter constraints.
//!
//! Constraints come from the registry alongside each model. A model with no
//! constraints configured accepts any parameters: absence of data is never
//! a rejection reason.

use serde::{Deserialize, Serialize};

/// Allowed parameter ranges for one model. Zero bounds and empty lists mean
/// "unconstrained".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConstraints {
    #[serde(default)]
    pub steps_min: u16,
    #[serde(default)]
    pub steps_max: u16,
    #[serde(default)]
    pub cfg_min: f64,
    #[serde(default)]
    pub cfg_max: f64,
    #[serde(default)]
    pub clip_skip: u8,
    #[serde(default)]
    pub samplers: Vec<String>,
    #[serde(default)]
    pub schedulers: Vec<String>,
}

impl ModelConstraints {
    /// Whether any bound or allow-list is set.
    pub fn has_constraints(&self) -> bool {
        self.steps_min > 0
            || self.steps_max > 0
            || self.cfg_min > 0.0
            || self.cfg_max > 0.0
            || !self.samplers.is_empty()
            || !self.schedulers.is_empty()
    }
}

/// Parameters proposed for a generation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationParams {
    pub steps: u32,
    pub cfg_scale: f64,
    #[serde(default)]
    pub sampler: Option<String>,
    #[serde(default)]
    pub scheduler: Option<String>,
}

/// Outcome of validating parameters against a model's constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamCheck {
    pub is_valid: bool,
    /// Human-readable rejection reason; empty when valid.
    pub reason: String,
}

impl ParamCheck {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: String::new(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Validate `params` against `constraints`.
///
/// Checks run in a fixed order (steps, guidance, sampler, scheduler) and the
/// first violation is reported.
pub fn validate_params(constraints: Option<&ModelConstraints>, params: &GenerationParams) -> ParamCheck {
    let Some(c) = constraints.filter(|c| c.has_constraints()) else {
        return ParamCheck::valid();
    };

    if c.steps_min > 0 && params.steps < u32::from(c.steps_min) {
        return ParamCheck::invalid(format!("Steps {} < min {}", params.steps, c.steps_min));
    }
    if c.steps_max > 0 && params.steps > u32::from(c.steps_max) {
        return ParamCheck::invalid(format!("Steps {} > max {}", params.steps, c.steps_max));
    }

    if c.cfg_min > 0.0 && params.cfg_scale < c.cfg_min {
        return ParamCheck::invalid(format!("CFG {} < min {}", params.cfg_scale, c.cfg_min));
    }
    if c.cfg_max > 0.0 && params.cfg_scale > c.cfg_max {
        return ParamCheck::invalid(format!("CFG {} > max {}", params.cfg_scale, c.cfg_max));
    }

    if let Some(sampler) = params.sampler.as_deref() {
        if !c.samplers.is_empty() && !c.samplers.iter().any(|s| s == sampler) {
            return ParamCheck::invalid(format!("Sampler '{sampler}' not allowed for this model"));
        }
    }

    if let Some(scheduler) = params.scheduler.as_deref() {
        if !c.schedulers.is_empty() && !c.schedulers.iter().any(|s| s == scheduler) {
            return ParamCheck::invalid(format!(
                "Scheduler '{scheduler}' not allowed for this model"
            ));
        }
    }

    ParamCheck::valid()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
