//! Repository for the `generation_jobs` table.
//!
//! Terminal transitions go through [`JobRepo::commit_terminal`] only: it
//! locks the job row, re-checks the terminal guard and writes every ledger
//! in the same transaction.

use grid_core::types::{EntityId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{GenerationJob, NewJob, TerminalCommit, TerminalOutcome};
use crate::store::StoreError;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, request_id, worker_id, kind, model, things, fake, censored, \
    assigned_at, ttl_secs, completed, faulted, cancelled, current_step, \
    total_steps, progress_percent, progress_updated_at, raw_things, reward, \
    result, tags, storage_locator, size_bytes, abort_reason, finished_at";

/// Provides guarded operations on generation jobs.
pub struct JobRepo;

impl JobRepo {
    // ── Queries ──────────────────────────────────────────────────────────

    pub async fn find_by_id(
        pool: &PgPool,
        id: EntityId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Non-terminal jobs whose TTL has run out at `now`, oldest first.
    pub async fn list_stale(pool: &PgPool, now: Timestamp) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             WHERE NOT completed AND NOT faulted \
               AND assigned_at + ttl_secs * INTERVAL '1 second' < $1 \
             ORDER BY assigned_at ASC"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Insert a job, take one output off its request and check the worker in.
    pub async fn insert(pool: &PgPool, job: &NewJob) -> Result<GenerationJob, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO generation_jobs
                (id, request_id, worker_id, kind, model, things, fake, assigned_at, ttl_secs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, GenerationJob>(&query)
            .bind(job.id)
            .bind(job.request_id)
            .bind(job.worker_id)
            .bind(job.kind.as_str())
            .bind(&job.model)
            .bind(job.things)
            .bind(job.fake)
            .bind(job.assigned_at)
            .bind(job.ttl_secs)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE generation_requests SET n = GREATEST(n - 1, 0) WHERE id = $1")
            .bind(job.request_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE workers SET last_check_in = $2 WHERE id = $1")
            .bind(job.worker_id)
            .bind(job.assigned_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    /// Update progress fields on a non-terminal job.
    pub async fn update_progress(
        pool: &PgPool,
        id: EntityId,
        current_step: i32,
        total_steps: i32,
        percent: i16,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET current_step = $2, total_steps = $3, progress_percent = $4, \
                 progress_updated_at = $5 \
             WHERE id = $1 AND NOT completed AND NOT faulted",
        )
        .bind(id)
        .bind(current_step)
        .bind(total_steps)
        .bind(percent)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a terminal transition in one transaction.
    ///
    /// Returns `Ok(None)` without writing anything when the locked row is
    /// already terminal.
    pub async fn commit_terminal(
        pool: &PgPool,
        commit: &TerminalCommit,
    ) -> Result<Option<GenerationJob>, StoreError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1 FOR UPDATE");
        let job = sqlx::query_as::<_, GenerationJob>(&query)
            .bind(commit.job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::JobNotFound(commit.job_id))?;

        if job.is_terminal() {
            tx.rollback().await?;
            return Ok(None);
        }

        let (completed, faulted, cancelled) = match &commit.outcome {
            TerminalOutcome::Completed { .. } => (true, false, false),
            TerminalOutcome::Cancelled => (false, true, true),
            TerminalOutcome::Aborted { .. } => (false, true, false),
        };
        let (result, tags, storage_locator, size_bytes, censored) = match &commit.outcome {
            TerminalOutcome::Completed {
                result,
                tags,
                storage_locator,
                size_bytes,
                censored,
            } => (
                Some(result.as_str()),
                tags.clone(),
                storage_locator.as_deref(),
                *size_bytes,
                *censored,
            ),
            _ => (None, Vec::new(), None, None, false),
        };
        let abort_reason = match &commit.outcome {
            TerminalOutcome::Aborted { reason } => Some(reason.as_str()),
            _ => None,
        };

        let query = format!(
            "UPDATE generation_jobs SET
                completed = $2, faulted = $3, cancelled = $4,
                raw_things = $5, reward = $6, result = $7, tags = $8,
                storage_locator = $9, size_bytes = $10, censored = $11,
                abort_reason = $12, finished_at = $13
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, GenerationJob>(&query)
            .bind(commit.job_id)
            .bind(completed)
            .bind(faulted)
            .bind(cancelled)
            .bind(commit.raw_things)
            .bind(commit.reward)
            .bind(result)
            .bind(&tags)
            .bind(storage_locator)
            .bind(size_bytes)
            .bind(censored)
            .bind(abort_reason)
            .bind(commit.finished_at)
            .fetch_one(&mut *tx)
            .await?;

        if commit.outcome.is_abort() {
            sqlx::query("UPDATE workers SET aborted_jobs = aborted_jobs + 1 WHERE id = $1")
                .bind(job.worker_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                "UPDATE workers SET \
                    contributions = contributions + $2, \
                    kudos = kudos + $3, \
                    fulfilments = fulfilments + 1, \
                    speed = COALESCE($4, speed) \
                 WHERE id = $1",
            )
            .bind(job.worker_id)
            .bind(commit.raw_things)
            .bind(commit.worker_kudos)
            .bind(commit.worker_speed)
            .execute(&mut *tx)
            .await?;

            if commit.count_public {
                sqlx::query(
                    "UPDATE generation_requests SET \
                        consumed_kudos = consumed_kudos + $2, \
                        consumed_things = consumed_things + $3, \
                        fulfilments = fulfilments + 1 \
                     WHERE id = $1",
                )
                .bind(job.request_id)
                .bind(commit.requester_kudos)
                .bind(commit.raw_things)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO usage_totals (kind, things, kudos, fulfilments) \
                     VALUES ($1, $2, $3, 1) \
                     ON CONFLICT (kind) DO UPDATE SET \
                        things = usage_totals.things + EXCLUDED.things, \
                        kudos = usage_totals.kudos + EXCLUDED.kudos, \
                        fulfilments = usage_totals.fulfilments + 1",
                )
                .bind(job.kind.as_str())
                .bind(commit.raw_things)
                .bind(commit.worker_kudos)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Delete non-terminal jobs assigned before `cutoff`.
    pub async fn delete_open_before(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM generation_jobs \
             WHERE NOT completed AND NOT faulted AND assigned_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
