//! Store traits consumed by the lifecycle service and the queue monitor.
//!
//! Both traits are implemented by [`crate::PgStore`] for production and by
//! [`crate::memory::MemoryStore`] for tests and local runs.

use async_trait::async_trait;
use grid_core::queue_health::{ModelBacklog, QueueStats};
use grid_core::types::{EntityId, Timestamp};

use crate::models::job::{GenerationJob, NewJob, TerminalCommit};
use crate::models::request::GenerationRequest;
use crate::models::worker::Worker;

/// Errors raised by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job not found: {0}")]
    JobNotFound(EntityId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Job rows and the worker/request lookups around them.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_worker(&self, id: EntityId) -> Result<Option<Worker>, StoreError>;

    async fn find_request(&self, id: EntityId) -> Result<Option<GenerationRequest>, StoreError>;

    async fn find_job(&self, id: EntityId) -> Result<Option<GenerationJob>, StoreError>;

    /// Persist a new job, take one output off its request and check the
    /// worker in.
    async fn insert_job(&self, job: &NewJob) -> Result<GenerationJob, StoreError>;

    /// Write progress fields unless the job is terminal. Returns whether the
    /// row was updated.
    async fn update_progress(
        &self,
        id: EntityId,
        current_step: i32,
        total_steps: i32,
        percent: i16,
        at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Apply a terminal transition atomically.
    ///
    /// Returns the updated job, or `None` when the job was already terminal
    /// (nothing is written in that case).
    async fn commit_terminal(
        &self,
        commit: &TerminalCommit,
    ) -> Result<Option<GenerationJob>, StoreError>;
}

/// Queue-wide scans used by the health monitor.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Non-terminal jobs assigned before `cutoff`, grouped by model, largest
    /// group first. Ages are measured against `now`.
    async fn stuck_jobs_by_model(
        &self,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<ModelBacklog>, StoreError>;

    async fn queue_stats(&self, active_since: Timestamp) -> Result<QueueStats, StoreError>;

    /// Non-terminal jobs whose TTL has expired at `now`.
    async fn stale_jobs(&self, now: Timestamp) -> Result<Vec<GenerationJob>, StoreError>;

    /// Delete non-terminal jobs assigned before `cutoff`.
    async fn delete_jobs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    /// Delete requests with no jobs left and nothing more wanted.
    async fn delete_orphaned_requests(&self) -> Result<u64, StoreError>;
}
