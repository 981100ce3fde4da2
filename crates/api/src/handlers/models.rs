//! Handlers for the model catalog.
//!
//! Every request reads one snapshot so a concurrent refresh cannot mix two
//! catalog generations in a single response.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use grid_core::catalog::{Capabilities, CatalogEntry};
use grid_core::constraints::{GenerationParams, ParamCheck};
use grid_core::error::CoreError;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Catalog listing with the generation it was read from.
#[derive(Debug, Serialize)]
pub struct ModelList<'a> {
    pub generation: u64,
    pub source: &'static str,
    pub models: Vec<&'a CatalogEntry>,
}

/// One model with its derived lookups.
#[derive(Debug, Serialize)]
pub struct ModelDetail<'a> {
    #[serde(flatten)]
    pub entry: &'a CatalogEntry,
    pub capabilities: Capabilities,
    pub video: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    pub model: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// GET /api/v1/models
pub async fn list_models(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.resolver.snapshot();
    let body = serde_json::to_value(DataResponse {
        data: ModelList {
            generation: snapshot.generation(),
            source: snapshot.source().as_str(),
            models: snapshot.entries(),
        },
    })
    .map_err(|e| CoreError::Internal(e.to_string()))?;

    Ok(Json(body))
}

/// GET /api/v1/models/{name}
///
/// Lookup is case-insensitive; the response carries the canonical name.
pub async fn get_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.resolver.snapshot();
    let entry = snapshot.entry(&name).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Model",
            id: name.clone(),
        })
    })?;

    let body = serde_json::to_value(DataResponse {
        data: ModelDetail {
            entry,
            capabilities: snapshot.capabilities(&entry.name),
            video: snapshot.is_video_model(&entry.name),
        },
    })
    .map_err(|e| CoreError::Internal(e.to_string()))?;

    Ok(Json(body))
}

/// POST /api/v1/models/validate
///
/// Models without constraints accept any parameters, unknown models
/// included.
pub async fn validate_params(
    State(state): State<AppState>,
    Json(input): Json<ValidateParams>,
) -> AppResult<Json<DataResponse<ParamCheck>>> {
    if input.model.trim().is_empty() {
        return Err(AppError::BadRequest("model must not be empty".into()));
    }
    let check = state.resolver.validate_params(&input.model, &input.params);
    if !check.is_valid {
        tracing::debug!(model = %input.model, reason = %check.reason, "Parameters rejected");
    }

    Ok(Json(DataResponse { data: check }))
}
