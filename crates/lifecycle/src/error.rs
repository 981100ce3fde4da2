use grid_core::types::EntityId;
use grid_db::StoreError;

/// Errors returned by lifecycle operations.
///
/// Hitting an already-terminal job is not an error; see
/// [`grid_core::lifecycle::Transition`].
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: EntityId },

    /// The explicitly requested model is not in the catalog.
    #[error("Unknown model requested: {0}")]
    UnknownModel(String),

    #[error("Worker has no models to serve")]
    NoModels,

    /// Persistence failed; the transition did not happen.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::JobNotFound(id) => LifecycleError::NotFound { entity: "Job", id },
            other => LifecycleError::Store(other),
        }
    }
}
