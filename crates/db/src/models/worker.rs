//! Worker entity and registration DTO.

use grid_core::types::{DbId, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `workers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Worker {
    pub id: EntityId,
    pub name: String,
    pub owner_id: DbId,
    /// Models the worker advertises.
    pub models: Vec<String>,
    /// Last measured throughput, in things per second.
    pub speed: f64,
    pub kudos_multiplier: f64,
    /// Total things produced.
    pub contributions: f64,
    pub fulfilments: i64,
    pub kudos: f64,
    pub aborted_jobs: i64,
    pub last_check_in: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for registering a worker.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorker {
    pub name: String,
    pub owner_id: DbId,
    pub models: Vec<String>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default = "default_multiplier")]
    pub kudos_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}
