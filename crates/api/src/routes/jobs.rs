//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                -> create_job
/// GET    /{id}            -> get_job
/// POST   /{id}/result     -> submit_result
/// POST   /{id}/cancel     -> cancel_job
/// POST   /{id}/abort      -> abort_job
/// POST   /{id}/progress   -> update_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::create_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/result", post(jobs::submit_result))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route("/{id}/abort", post(jobs::abort_job))
        .route("/{id}/progress", post(jobs::update_progress))
}
