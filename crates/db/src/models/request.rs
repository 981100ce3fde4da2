//! Parent generation request entity.

use grid_core::job_kind::JobKind;
use grid_core::types::{DbId, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `generation_requests` table.
///
/// `things` and `kudos` are priced per job; `n` is the number of outputs
/// still wanted and drops by one every time a job is handed out.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationRequest {
    pub id: EntityId,
    pub owner_id: DbId,
    #[sqlx(try_from = "String")]
    pub kind: JobKind,
    pub models: Vec<String>,
    pub things: f64,
    pub kudos: f64,
    pub n: i32,
    pub consumed_kudos: f64,
    pub consumed_things: f64,
    pub fulfilments: i64,
    pub created_at: Timestamp,
}

/// DTO for submitting a request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequest {
    pub owner_id: DbId,
    pub kind: JobKind,
    #[serde(default)]
    pub models: Vec<String>,
    pub things: f64,
    pub kudos: f64,
    pub n: i32,
}
