pub mod health;
pub mod jobs;
pub mod models;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /models                      list known models
/// /models/validate             validate generation parameters (POST)
/// /models/{name}               model details
///
/// /jobs                        assign a job (POST)
/// /jobs/{id}                   job details
/// /jobs/{id}/result            submit result (POST)
/// /jobs/{id}/cancel            cancel (POST)
/// /jobs/{id}/abort             abort without reward (POST)
/// /jobs/{id}/progress          report step progress (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/models", models::router())
        .nest("/jobs", jobs::router())
}
