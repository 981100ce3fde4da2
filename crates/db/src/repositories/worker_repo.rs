//! Repository for the `workers` table.

use grid_core::types::{EntityId, Timestamp};
use sqlx::PgPool;

use crate::models::worker::Worker;

/// Column list for `workers` queries.
const COLUMNS: &str = "\
    id, name, owner_id, models, speed, kudos_multiplier, contributions, \
    fulfilments, kudos, aborted_jobs, last_check_in, created_at";

/// Provides access to registered workers.
pub struct WorkerRepo;

impl WorkerRepo {
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Worker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers WHERE id = $1");
        sqlx::query_as::<_, Worker>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count workers that checked in at or after `since`.
    pub async fn count_active(pool: &PgPool, since: Timestamp) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM workers WHERE last_check_in >= $1")
                .bind(since)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
