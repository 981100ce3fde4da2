use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct CatalogHealth {
    pub generation: u64,
    pub source: &'static str,
    pub models: usize,
}

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database or catalog is unusable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub catalog: CatalogHealth,
}

/// GET /health -- service, database and catalog health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => grid_db::health_check(pool).await.is_ok(),
        None => true,
    };
    let snapshot = state.resolver.snapshot();
    let catalog = CatalogHealth {
        generation: snapshot.generation(),
        source: snapshot.source().as_str(),
        models: snapshot.len(),
    };

    let status = if db_healthy && !snapshot.is_empty() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        catalog,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
