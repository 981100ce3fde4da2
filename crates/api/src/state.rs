use std::sync::Arc;

use grid_lifecycle::JobLifecycle;
use grid_registry::ModelResolver;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database pool, absent when running on the in-memory store.
    pub pool: Option<grid_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub lifecycle: Arc<JobLifecycle>,
    pub resolver: Arc<ModelResolver>,
}
