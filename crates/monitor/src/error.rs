use grid_db::StoreError;
use grid_lifecycle::LifecycleError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Stale job abort failed: {0}")]
    Abort(#[from] LifecycleError),
}
