//! Handlers for the job lifecycle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use grid_core::lifecycle::Transition;
use grid_core::types::EntityId;
use grid_lifecycle::ResultReport;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub request_id: EntityId,
    pub worker_id: EntityId,
    /// Skip model selection and use this model.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AbortJob {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub current_step: i32,
    pub total_steps: i32,
}

#[derive(Debug, Serialize)]
pub struct ProgressAck {
    pub updated: bool,
}

// ---------------------------------------------------------------------------
// Assignment and queries
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Assign a job to a worker. Returns 201 with the job details.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .lifecycle
        .create(input.request_id, input.worker_id, input.model.as_deref())
        .await?;
    let details = state.lifecycle.details(job.id).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: details })))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    let details = state.lifecycle.details(id).await?;
    Ok(Json(DataResponse { data: details }))
}

/// POST /api/v1/jobs/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<ProgressUpdate>,
) -> AppResult<Json<DataResponse<ProgressAck>>> {
    let updated = state
        .lifecycle
        .update_progress(id, input.current_step, input.total_steps)
        .await?;
    Ok(Json(DataResponse {
        data: ProgressAck { updated },
    }))
}

// ---------------------------------------------------------------------------
// Terminal transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/result
///
/// A repeated submission answers 200 with `already_terminal`.
pub async fn submit_result(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(report): Json<ResultReport>,
) -> AppResult<Json<DataResponse<Transition>>> {
    let transition = state.lifecycle.report_result(id, report).await?;
    Ok(Json(DataResponse { data: transition }))
}

/// POST /api/v1/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Transition>>> {
    let transition = state.lifecycle.cancel(id).await?;
    Ok(Json(DataResponse { data: transition }))
}

/// POST /api/v1/jobs/{id}/abort
pub async fn abort_job(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<AbortJob>,
) -> AppResult<Json<DataResponse<Transition>>> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("reason must not be empty".into()));
    }
    let transition = state.lifecycle.abort(id, reason).await?;
    Ok(Json(DataResponse { data: transition }))
}
