//! In-memory store for tests and database-less local runs.
//!
//! Mirrors the Postgres semantics: the terminal guard is re-checked under
//! the same lock that performs the writes, so concurrent terminal commits
//! on one job serialise exactly as they do behind `SELECT ... FOR UPDATE`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use grid_core::job_kind::JobKind;
use grid_core::queue_health::{ModelBacklog, QueueStats};
use grid_core::types::{EntityId, Timestamp};
use uuid::Uuid;

use crate::models::job::{GenerationJob, NewJob, TerminalCommit, TerminalOutcome};
use crate::models::request::{CreateRequest, GenerationRequest};
use crate::models::usage::UsageTotals;
use crate::models::worker::{CreateWorker, Worker};
use crate::store::{JobStore, QueueStore, StoreError};

#[derive(Default)]
struct MemoryState {
    workers: HashMap<EntityId, Worker>,
    requests: HashMap<EntityId, GenerationRequest>,
    jobs: HashMap<EntityId, GenerationJob>,
    usage: HashMap<JobKind, UsageTotals>,
}

/// Mutex-guarded maps implementing both store traits.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_worker(&self, input: CreateWorker) -> Worker {
        let now = Utc::now();
        let worker = Worker {
            id: Uuid::new_v4(),
            name: input.name,
            owner_id: input.owner_id,
            models: input.models,
            speed: input.speed,
            kudos_multiplier: input.kudos_multiplier,
            contributions: 0.0,
            fulfilments: 0,
            kudos: 0.0,
            aborted_jobs: 0,
            last_check_in: now,
            created_at: now,
        };
        self.lock().workers.insert(worker.id, worker.clone());
        worker
    }

    pub fn add_request(&self, input: CreateRequest) -> GenerationRequest {
        let request = GenerationRequest {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            kind: input.kind,
            models: input.models,
            things: input.things,
            kudos: input.kudos,
            n: input.n.max(0),
            consumed_kudos: 0.0,
            consumed_things: 0.0,
            fulfilments: 0,
            created_at: Utc::now(),
        };
        self.lock().requests.insert(request.id, request.clone());
        request
    }

    /// Overwrite a worker's last check-in.
    pub fn set_check_in(&self, worker_id: EntityId, at: Timestamp) {
        if let Some(w) = self.lock().workers.get_mut(&worker_id) {
            w.last_check_in = at;
        }
    }

    /// Public usage totals for one kind.
    pub fn usage(&self, kind: JobKind) -> UsageTotals {
        self.lock()
            .usage
            .get(&kind)
            .copied()
            .unwrap_or_else(|| UsageTotals::empty(kind))
    }

    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_worker(&self, id: EntityId) -> Result<Option<Worker>, StoreError> {
        Ok(self.lock().workers.get(&id).cloned())
    }

    async fn find_request(&self, id: EntityId) -> Result<Option<GenerationRequest>, StoreError> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    async fn find_job(&self, id: EntityId) -> Result<Option<GenerationJob>, StoreError> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn insert_job(&self, job: &NewJob) -> Result<GenerationJob, StoreError> {
        self.check_writable()?;
        let mut state = self.lock();

        let row = GenerationJob {
            id: job.id,
            request_id: job.request_id,
            worker_id: job.worker_id,
            kind: job.kind,
            model: job.model.clone(),
            things: job.things,
            fake: job.fake,
            censored: false,
            assigned_at: job.assigned_at,
            ttl_secs: job.ttl_secs,
            completed: false,
            faulted: false,
            cancelled: false,
            current_step: 0,
            total_steps: 0,
            progress_percent: 0,
            progress_updated_at: None,
            raw_things: 0.0,
            reward: 0.0,
            result: None,
            tags: Vec::new(),
            storage_locator: None,
            size_bytes: None,
            abort_reason: None,
            finished_at: None,
        };
        state.jobs.insert(row.id, row.clone());

        if let Some(request) = state.requests.get_mut(&job.request_id) {
            request.n = (request.n - 1).max(0);
        }
        if let Some(worker) = state.workers.get_mut(&job.worker_id) {
            worker.last_check_in = job.assigned_at;
        }
        Ok(row)
    }

    async fn update_progress(
        &self,
        id: EntityId,
        current_step: i32,
        total_steps: i32,
        percent: i16,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut state = self.lock();
        match state.jobs.get_mut(&id) {
            Some(job) if !job.is_terminal() => {
                job.current_step = current_step;
                job.total_steps = total_steps;
                job.progress_percent = percent;
                job.progress_updated_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_terminal(
        &self,
        commit: &TerminalCommit,
    ) -> Result<Option<GenerationJob>, StoreError> {
        self.check_writable()?;
        let mut state = self.lock();

        let job = state
            .jobs
            .get_mut(&commit.job_id)
            .ok_or(StoreError::JobNotFound(commit.job_id))?;
        if job.is_terminal() {
            return Ok(None);
        }

        match &commit.outcome {
            TerminalOutcome::Completed {
                result,
                tags,
                storage_locator,
                size_bytes,
                censored,
            } => {
                job.completed = true;
                job.result = Some(result.clone());
                job.tags = tags.clone();
                job.storage_locator = storage_locator.clone();
                job.size_bytes = *size_bytes;
                job.censored = *censored;
            }
            TerminalOutcome::Cancelled => {
                job.faulted = true;
                job.cancelled = true;
            }
            TerminalOutcome::Aborted { reason } => {
                job.faulted = true;
                job.abort_reason = Some(reason.clone());
            }
        }
        job.raw_things = commit.raw_things;
        job.reward = commit.reward;
        job.finished_at = Some(commit.finished_at);

        let updated = job.clone();

        if let Some(worker) = state.workers.get_mut(&updated.worker_id) {
            if commit.outcome.is_abort() {
                worker.aborted_jobs += 1;
            } else {
                worker.contributions += commit.raw_things;
                worker.kudos += commit.worker_kudos;
                worker.fulfilments += 1;
                if let Some(speed) = commit.worker_speed {
                    worker.speed = speed;
                }
            }
        }

        if commit.count_public && !commit.outcome.is_abort() {
            if let Some(request) = state.requests.get_mut(&updated.request_id) {
                request.consumed_kudos += commit.requester_kudos;
                request.consumed_things += commit.raw_things;
                request.fulfilments += 1;
            }
            let totals = state
                .usage
                .entry(updated.kind)
                .or_insert_with(|| UsageTotals::empty(updated.kind));
            totals.things += commit.raw_things;
            totals.kudos += commit.worker_kudos;
            totals.fulfilments += 1;
        }

        Ok(Some(updated))
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn stuck_jobs_by_model(
        &self,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<ModelBacklog>, StoreError> {
        let state = self.lock();
        let mut groups: HashMap<&str, (usize, Timestamp)> = HashMap::new();
        for job in state.jobs.values() {
            if job.is_terminal() || job.assigned_at >= cutoff {
                continue;
            }
            let entry = groups
                .entry(job.model.as_str())
                .or_insert((0, job.assigned_at));
            entry.0 += 1;
            entry.1 = entry.1.min(job.assigned_at);
        }

        let mut backlog: Vec<ModelBacklog> = groups
            .into_iter()
            .map(|(model, (count, oldest))| ModelBacklog {
                model: model.to_string(),
                count,
                oldest_minutes: (now - oldest).num_seconds() as f64 / 60.0,
            })
            .collect();
        backlog.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.model.cmp(&b.model)));
        Ok(backlog)
    }

    async fn queue_stats(&self, active_since: Timestamp) -> Result<QueueStats, StoreError> {
        let state = self.lock();
        let waiting: Vec<&GenerationRequest> =
            state.requests.values().filter(|r| r.n > 0).collect();
        Ok(QueueStats {
            processing_count: state.jobs.values().filter(|j| !j.is_terminal()).count() as u64,
            waiting_count: waiting.len() as u64,
            waiting_images: waiting.iter().map(|r| r.n as u64).sum(),
            active_workers: state
                .workers
                .values()
                .filter(|w| w.last_check_in >= active_since)
                .count() as u64,
        })
    }

    async fn stale_jobs(&self, now: Timestamp) -> Result<Vec<GenerationJob>, StoreError> {
        let mut stale: Vec<GenerationJob> = self
            .lock()
            .jobs
            .values()
            .filter(|j| j.is_stale_at(now))
            .cloned()
            .collect();
        stale.sort_by_key(|j| j.assigned_at);
        Ok(stale)
    }

    async fn delete_jobs_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut state = self.lock();
        let before = state.jobs.len();
        state
            .jobs
            .retain(|_, j| j.is_terminal() || j.assigned_at >= cutoff);
        Ok((before - state.jobs.len()) as u64)
    }

    async fn delete_orphaned_requests(&self) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut guard = self.lock();
        let state = &mut *guard;
        let before = state.requests.len();
        let jobs = &state.jobs;
        state
            .requests
            .retain(|id, r| r.n > 0 || jobs.values().any(|j| j.request_id == *id));
        Ok((before - state.requests.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn seed(store: &MemoryStore) -> (Worker, GenerationRequest) {
        let worker = store.add_worker(CreateWorker {
            name: "w1".into(),
            owner_id: 1,
            models: vec!["A".into()],
            speed: 10.0,
            kudos_multiplier: 1.0,
        });
        let request = store.add_request(CreateRequest {
            owner_id: 2,
            kind: JobKind::Image,
            models: vec![],
            things: 50.0,
            kudos: 10.0,
            n: 2,
        });
        (worker, request)
    }

    fn new_job(worker: &Worker, request: &GenerationRequest, assigned_at: Timestamp) -> NewJob {
        NewJob {
            id: Uuid::new_v4(),
            request_id: request.id,
            worker_id: worker.id,
            kind: JobKind::Image,
            model: "A".into(),
            things: 50.0,
            fake: false,
            assigned_at,
            ttl_secs: 60,
        }
    }

    fn completion(job_id: EntityId) -> TerminalCommit {
        TerminalCommit {
            job_id,
            outcome: TerminalOutcome::Completed {
                result: "ok".into(),
                tags: vec![],
                storage_locator: None,
                size_bytes: None,
                censored: false,
            },
            raw_things: 50.0,
            reward: 10.0,
            worker_kudos: 10.0,
            requester_kudos: 10.0,
            worker_speed: None,
            count_public: true,
            finished_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_takes_one_output_off_request() {
        let store = MemoryStore::new();
        let (worker, request) = seed(&store);
        store
            .insert_job(&new_job(&worker, &request, Utc::now()))
            .await
            .unwrap();
        let request = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(request.n, 1);
    }

    #[tokio::test]
    async fn second_terminal_commit_is_noop() {
        let store = MemoryStore::new();
        let (worker, request) = seed(&store);
        let job = store
            .insert_job(&new_job(&worker, &request, Utc::now()))
            .await
            .unwrap();

        assert!(store.commit_terminal(&completion(job.id)).await.unwrap().is_some());
        assert!(store.commit_terminal(&completion(job.id)).await.unwrap().is_none());

        let worker = store.find_worker(worker.id).await.unwrap().unwrap();
        assert_eq!(worker.fulfilments, 1);
        assert_eq!(store.usage(JobKind::Image).fulfilments, 1);
    }

    #[tokio::test]
    async fn unavailable_store_rejects_writes() {
        let store = MemoryStore::new();
        let (worker, request) = seed(&store);
        let job = store
            .insert_job(&new_job(&worker, &request, Utc::now()))
            .await
            .unwrap();
        store.set_unavailable(true);
        assert_matches!(
            store.commit_terminal(&completion(job.id)).await,
            Err(StoreError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn missing_job_is_an_error() {
        let store = MemoryStore::new();
        assert_matches!(
            store.commit_terminal(&completion(Uuid::new_v4())).await,
            Err(StoreError::JobNotFound(_))
        );
    }

    #[tokio::test]
    async fn stuck_jobs_grouped_by_model() {
        let store = MemoryStore::new();
        let (worker, request) = seed(&store);
        let now = Utc::now();
        for minutes in [20, 15, 1] {
            store
                .insert_job(&new_job(&worker, &request, now - Duration::minutes(minutes)))
                .await
                .unwrap();
        }
        let groups = store
            .stuck_jobs_by_model(now - Duration::minutes(10), now)
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 2);
        assert!((groups[0].oldest_minutes - 20.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn cleanup_removes_old_jobs_then_orphans() {
        let store = MemoryStore::new();
        let (worker, request) = seed(&store);
        let now = Utc::now();
        store
            .insert_job(&new_job(&worker, &request, now - Duration::minutes(40)))
            .await
            .unwrap();
        store
            .insert_job(&new_job(&worker, &request, now - Duration::minutes(45)))
            .await
            .unwrap();

        // Request still has a job, so it is not orphaned yet.
        assert_eq!(store.delete_orphaned_requests().await.unwrap(), 0);
        assert_eq!(
            store.delete_jobs_before(now - Duration::minutes(30)).await.unwrap(),
            2
        );
        assert_eq!(store.delete_orphaned_requests().await.unwrap(), 1);
        assert_eq!(store.request_count(), 0);
    }
}
