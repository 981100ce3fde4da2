//! Route definitions for the `/models` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::models;
use crate::state::AppState;

/// Routes mounted at `/models`.
///
/// ```text
/// GET    /                -> list_models
/// POST   /validate        -> validate_params
/// GET    /{name}          -> get_model
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(models::list_models))
        .route("/validate", post(models::validate_params))
        .route("/{name}", get(models::get_model))
}
