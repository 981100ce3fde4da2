//! The job lifecycle service.
//!
//! Operations follow one pattern: load the job, short-circuit with the
//! [`Transition::AlreadyTerminal`] sentinel if it is already terminal, build a
//! [`TerminalCommit`] and hand it to the store, which re-checks the guard
//! under a row lock. A commit that loses that race also yields the sentinel.
//! Notifications are enqueued only after the commit succeeded.

use std::sync::Arc;

use chrono::Utc;
use grid_core::job_kind::{self, RewardInput};
use grid_core::lifecycle::{self, TerminalState, Transition};
use grid_core::types::{EntityId, Timestamp};
use grid_db::models::job::{GenerationJob, JobDetails, NewJob, TerminalCommit, TerminalOutcome};
use grid_db::models::request::GenerationRequest;
use grid_db::models::worker::Worker;
use grid_db::JobStore;
use grid_events::{alerts, Notifier};
use grid_registry::ModelResolver;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;

/// What a worker submits when it finishes a job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultReport {
    /// Generated payload (text, or a reference to the stored media).
    pub payload: String,
    /// Throughput the worker measured for this job.
    #[serde(default)]
    pub things_per_sec: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub storage_locator: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<i64>,
    #[serde(default)]
    pub censored: bool,
}

pub struct JobLifecycle {
    store: Arc<dyn JobStore>,
    resolver: Arc<ModelResolver>,
    notifier: Notifier,
    config: LifecycleConfig,
}

impl JobLifecycle {
    pub fn new(
        store: Arc<dyn JobStore>,
        resolver: Arc<ModelResolver>,
        notifier: Notifier,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            notifier,
            config,
        }
    }

    pub fn resolver(&self) -> &Arc<ModelResolver> {
        &self.resolver
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Assign a new job for `request_id` to `worker_id`.
    ///
    /// Without an explicit model, one is picked at random among the worker's
    /// models the request asked for (or among all the worker's models when
    /// the request has no usable preference). The chosen model must be in
    /// the catalog; its canonical name is stored.
    pub async fn create(
        &self,
        request_id: EntityId,
        worker_id: EntityId,
        explicit_model: Option<&str>,
    ) -> Result<GenerationJob, LifecycleError> {
        let worker = self.load_worker(worker_id).await?;
        let request = self.load_request(request_id).await?;

        let requested = match explicit_model {
            Some(name) => name.to_string(),
            None => pick_model(&worker, &request)?,
        };
        let model = self
            .resolver
            .normalize_model_name(&requested)
            .ok_or_else(|| LifecycleError::UnknownModel(requested.clone()))?;

        let new_job = NewJob {
            id: Uuid::new_v4(),
            request_id,
            worker_id,
            kind: request.kind,
            model,
            things: request.things,
            fake: worker.owner_id == request.owner_id,
            assigned_at: Utc::now(),
            ttl_secs: self.config.ttl_secs,
        };
        let job = self.store.insert_job(&new_job).await?;

        tracing::info!(
            job_id = %job.id,
            request_id = %request_id,
            worker = %worker.name,
            model = %job.model,
            kind = %job.kind,
            "Job assigned"
        );
        self.notifier
            .notify(alerts::job_popped(job.id, &worker.name, &job.model, job.kind));

        Ok(job)
    }

    // -----------------------------------------------------------------------
    // Terminal transitions
    // -----------------------------------------------------------------------

    /// Complete a job with the worker's result and credit its reward.
    pub async fn report_result(
        &self,
        job_id: EntityId,
        report: ResultReport,
    ) -> Result<Transition, LifecycleError> {
        let job = self.load_job(job_id).await?;
        if let Some(state) = job.terminal_state() {
            return Ok(Transition::AlreadyTerminal { state });
        }
        let worker = self.load_worker(job.worker_id).await?;
        let request = self.load_request(job.request_id).await?;
        let now = Utc::now();

        let payload = lifecycle::sanitize_payload(&report.payload);
        let raw_things = job.kind.produced_things(job.things, Some(&payload));
        let reward = job_kind::compute_reward(reward_input(raw_things, &request));
        let measured = report
            .things_per_sec
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or_else(|| lifecycle::blend_speed(worker.speed, raw_things, job.elapsed_secs(now)));

        let commit = TerminalCommit {
            job_id,
            outcome: TerminalOutcome::Completed {
                result: payload,
                tags: report
                    .tags
                    .iter()
                    .map(|t| lifecycle::sanitize_payload(t))
                    .collect(),
                storage_locator: report
                    .storage_locator
                    .as_deref()
                    .map(lifecycle::sanitize_payload),
                size_bytes: report.size_bytes,
                censored: report.censored,
            },
            raw_things,
            reward,
            worker_kudos: reward,
            requester_kudos: job_kind::requester_kudos(reward, report.censored),
            worker_speed: Some(measured),
            count_public: !job.fake,
            finished_at: now,
        };

        let Some(done) = self.store.commit_terminal(&commit).await? else {
            return self.lost_race(job_id, TerminalState::Completed).await;
        };

        tracing::info!(
            job_id = %job_id,
            worker = %worker.name,
            reward,
            raw_things,
            fake = job.fake,
            censored = done.censored,
            "Job completed"
        );
        self.notifier.notify(alerts::job_completed(
            job_id,
            &worker.name,
            &done.model,
            reward,
            raw_things,
        ));

        Ok(Transition::Applied { reward })
    }

    /// Cancel a job in progress.
    ///
    /// Partial work is paid as if the job had completed, measured with the
    /// worker's stored throughput, and the returned reward includes the
    /// worker's multiplier.
    pub async fn cancel(&self, job_id: EntityId) -> Result<Transition, LifecycleError> {
        let job = self.load_job(job_id).await?;
        if let Some(state) = job.terminal_state() {
            return Ok(Transition::AlreadyTerminal { state });
        }
        let worker = self.load_worker(job.worker_id).await?;
        let request = self.load_request(job.request_id).await?;

        let raw_things = job.kind.produced_things(job.things, None);
        let base = job_kind::compute_reward(reward_input(raw_things, &request));
        let reward = base * worker.kudos_multiplier.max(0.0);

        let commit = TerminalCommit {
            job_id,
            outcome: TerminalOutcome::Cancelled,
            raw_things,
            reward,
            worker_kudos: base,
            requester_kudos: job_kind::requester_kudos(base, job.censored),
            worker_speed: None,
            count_public: !job.fake,
            finished_at: Utc::now(),
        };

        if self.store.commit_terminal(&commit).await?.is_none() {
            return self.lost_race(job_id, TerminalState::Cancelled).await;
        }

        tracing::info!(
            job_id = %job_id,
            worker = %worker.name,
            reward,
            speed = worker.speed,
            "Job cancelled"
        );
        self.notifier
            .notify(alerts::job_cancelled(job_id, &worker.name, &job.model, reward));

        Ok(Transition::Applied { reward })
    }

    /// Fault a job without reward.
    pub async fn abort(&self, job_id: EntityId, reason: &str) -> Result<Transition, LifecycleError> {
        abort_job(self.store.as_ref(), &self.notifier, job_id, reason).await
    }

    // -----------------------------------------------------------------------
    // Queries and progress
    // -----------------------------------------------------------------------

    /// Record step progress. Returns `false` for terminal jobs.
    pub async fn update_progress(
        &self,
        job_id: EntityId,
        current_step: i32,
        total_steps: i32,
    ) -> Result<bool, LifecycleError> {
        let job = self.load_job(job_id).await?;
        if job.is_terminal() {
            return Ok(false);
        }
        let percent = lifecycle::progress_percent(current_step, total_steps);
        let updated = self
            .store
            .update_progress(job_id, current_step.max(0), total_steps.max(0), percent, Utc::now())
            .await?;
        if updated {
            tracing::debug!(job_id = %job_id, current_step, total_steps, percent, "Job progress");
        }
        Ok(updated)
    }

    pub async fn is_stale(&self, job_id: EntityId) -> Result<bool, LifecycleError> {
        self.is_stale_at(job_id, Utc::now()).await
    }

    pub async fn is_stale_at(&self, job_id: EntityId, now: Timestamp) -> Result<bool, LifecycleError> {
        Ok(self.load_job(job_id).await?.is_stale_at(now))
    }

    pub async fn job(&self, job_id: EntityId) -> Result<GenerationJob, LifecycleError> {
        self.load_job(job_id).await
    }

    /// Public view of a job, including the expected time left.
    pub async fn details(&self, job_id: EntityId) -> Result<JobDetails, LifecycleError> {
        let job = self.load_job(job_id).await?;
        let speed = self
            .store
            .find_worker(job.worker_id)
            .await?
            .map(|w| w.speed)
            .unwrap_or_default();
        Ok(job.details(speed, Utc::now()))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_job(&self, id: EntityId) -> Result<GenerationJob, LifecycleError> {
        load_job(self.store.as_ref(), id).await
    }

    async fn load_worker(&self, id: EntityId) -> Result<Worker, LifecycleError> {
        self.store
            .find_worker(id)
            .await?
            .ok_or(LifecycleError::NotFound { entity: "Worker", id })
    }

    async fn load_request(&self, id: EntityId) -> Result<GenerationRequest, LifecycleError> {
        self.store
            .find_request(id)
            .await?
            .ok_or(LifecycleError::NotFound { entity: "Request", id })
    }

    /// Sentinel for a commit that found the job already terminal.
    async fn lost_race(
        &self,
        job_id: EntityId,
        fallback: TerminalState,
    ) -> Result<Transition, LifecycleError> {
        already_terminal(self.store.as_ref(), job_id, fallback).await
    }
}

fn pick_model(worker: &Worker, request: &GenerationRequest) -> Result<String, LifecycleError> {
    let mut rng = rand::rng();
    lifecycle::select_model(&worker.models, &request.models, &mut rng).ok_or(LifecycleError::NoModels)
}

fn reward_input(raw_things: f64, request: &GenerationRequest) -> RewardInput {
    RewardInput {
        raw_things,
        request_things: request.things,
        request_kudos: request.kudos,
    }
}

async fn load_job(store: &dyn JobStore, id: EntityId) -> Result<GenerationJob, LifecycleError> {
    store
        .find_job(id)
        .await?
        .ok_or(LifecycleError::NotFound { entity: "Job", id })
}

async fn already_terminal(
    store: &dyn JobStore,
    job_id: EntityId,
    fallback: TerminalState,
) -> Result<Transition, LifecycleError> {
    let state = load_job(store, job_id)
        .await?
        .terminal_state()
        .unwrap_or(fallback);
    tracing::debug!(job_id = %job_id, ?state, "Job already terminal");
    Ok(Transition::AlreadyTerminal { state })
}

/// Fault a job without reward and bump the worker's aborted-job counter.
///
/// Shared by [`JobLifecycle::abort`] and the stale-job sweep, which runs
/// without a model resolver.
pub async fn abort_job(
    store: &dyn JobStore,
    notifier: &Notifier,
    job_id: EntityId,
    reason: &str,
) -> Result<Transition, LifecycleError> {
    let job = load_job(store, job_id).await?;
    if let Some(state) = job.terminal_state() {
        return Ok(Transition::AlreadyTerminal { state });
    }
    let reason = lifecycle::sanitize_payload(reason);

    let commit = TerminalCommit {
        job_id,
        outcome: TerminalOutcome::Aborted {
            reason: reason.clone(),
        },
        raw_things: 0.0,
        reward: 0.0,
        worker_kudos: 0.0,
        requester_kudos: 0.0,
        worker_speed: None,
        count_public: false,
        finished_at: Utc::now(),
    };

    if store.commit_terminal(&commit).await?.is_none() {
        return already_terminal(store, job_id, TerminalState::Faulted).await;
    }

    // Already committed: a failed lookup only costs the display name.
    let worker_name = match store.find_worker(job.worker_id).await {
        Ok(worker) => worker.map(|w| w.name),
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Worker lookup failed after abort");
            None
        }
    }
    .unwrap_or_else(|| job.worker_id.to_string());

    tracing::warn!(
        job_id = %job_id,
        worker = %worker_name,
        model = %job.model,
        reason = %reason,
        "Job aborted"
    );
    notifier.notify(alerts::job_aborted(job_id, &worker_name, &job.model, &reason));

    Ok(Transition::Applied { reward: 0.0 })
}
