//! Postgres-backed store.

use async_trait::async_trait;
use grid_core::queue_health::{ModelBacklog, QueueStats};
use grid_core::types::{EntityId, Timestamp};

use crate::models::job::{GenerationJob, NewJob, TerminalCommit};
use crate::models::request::GenerationRequest;
use crate::models::worker::Worker;
use crate::repositories::{JobRepo, QueueRepo, RequestRepo, WorkerRepo};
use crate::store::{JobStore, QueueStore, StoreError};
use crate::DbPool;

/// [`JobStore`] and [`QueueStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn find_worker(&self, id: EntityId) -> Result<Option<Worker>, StoreError> {
        Ok(WorkerRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_request(&self, id: EntityId) -> Result<Option<GenerationRequest>, StoreError> {
        Ok(RequestRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_job(&self, id: EntityId) -> Result<Option<GenerationJob>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn insert_job(&self, job: &NewJob) -> Result<GenerationJob, StoreError> {
        Ok(JobRepo::insert(&self.pool, job).await?)
    }

    async fn update_progress(
        &self,
        id: EntityId,
        current_step: i32,
        total_steps: i32,
        percent: i16,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(JobRepo::update_progress(&self.pool, id, current_step, total_steps, percent, at).await?)
    }

    async fn commit_terminal(
        &self,
        commit: &TerminalCommit,
    ) -> Result<Option<GenerationJob>, StoreError> {
        JobRepo::commit_terminal(&self.pool, commit).await
    }
}

#[async_trait]
impl QueueStore for PgStore {
    async fn stuck_jobs_by_model(
        &self,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<ModelBacklog>, StoreError> {
        Ok(QueueRepo::stuck_by_model(&self.pool, cutoff, now).await?)
    }

    async fn queue_stats(&self, active_since: Timestamp) -> Result<QueueStats, StoreError> {
        Ok(QueueRepo::stats(&self.pool, active_since).await?)
    }

    async fn stale_jobs(&self, now: Timestamp) -> Result<Vec<GenerationJob>, StoreError> {
        Ok(JobRepo::list_stale(&self.pool, now).await?)
    }

    async fn delete_jobs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(JobRepo::delete_open_before(&self.pool, cutoff).await?)
    }

    async fn delete_orphaned_requests(&self) -> Result<u64, StoreError> {
        Ok(RequestRepo::delete_orphaned(&self.pool).await?)
    }
}
