//! Queue-wide aggregates for the health monitor.

use grid_core::queue_health::{ModelBacklog, QueueStats};
use grid_core::types::Timestamp;
use sqlx::{FromRow, PgPool};

use crate::repositories::{RequestRepo, WorkerRepo};

#[derive(Debug, FromRow)]
struct BacklogRow {
    model: String,
    count: i64,
    oldest_minutes: f64,
}

/// Read-only queue scans.
pub struct QueueRepo;

impl QueueRepo {
    /// Non-terminal jobs assigned before `cutoff`, grouped by model.
    pub async fn stuck_by_model(
        pool: &PgPool,
        cutoff: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<ModelBacklog>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BacklogRow>(
            "SELECT model, COUNT(*) AS count, \
                    (EXTRACT(EPOCH FROM ($2 - MIN(assigned_at))) / 60.0)::FLOAT8 AS oldest_minutes \
             FROM generation_jobs \
             WHERE NOT completed AND NOT faulted AND assigned_at < $1 \
             GROUP BY model \
             ORDER BY count DESC, model ASC",
        )
        .bind(cutoff)
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ModelBacklog {
                model: r.model,
                count: r.count.max(0) as usize,
                oldest_minutes: r.oldest_minutes,
            })
            .collect())
    }

    /// Processing, waiting and active-worker counters.
    pub async fn stats(pool: &PgPool, active_since: Timestamp) -> Result<QueueStats, sqlx::Error> {
        let (processing,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generation_jobs WHERE NOT completed AND NOT faulted",
        )
        .fetch_one(pool)
        .await?;
        let (waiting, waiting_images) = RequestRepo::waiting_totals(pool).await?;
        let active = WorkerRepo::count_active(pool, active_since).await?;

        Ok(QueueStats {
            processing_count: processing.max(0) as u64,
            waiting_count: waiting.max(0) as u64,
            waiting_images: waiting_images.max(0) as u64,
            active_workers: active.max(0) as u64,
        })
    }
}
