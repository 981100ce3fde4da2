//! Repository for the `generation_requests` table.

use grid_core::types::EntityId;
use sqlx::PgPool;

use crate::models::request::GenerationRequest;

/// Column list for `generation_requests` queries.
const COLUMNS: &str = "\
    id, owner_id, kind, models, things, kudos, n, consumed_kudos, \
    consumed_things, fulfilments, created_at";

/// Provides access to parent generation requests.
pub struct RequestRepo;

impl RequestRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: EntityId,
    ) -> Result<Option<GenerationRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_requests WHERE id = $1");
        sqlx::query_as::<_, GenerationRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Requests still wanting output and the number of outputs wanted.
    pub async fn waiting_totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(n), 0)::BIGINT \
             FROM generation_requests WHERE n > 0",
        )
        .fetch_one(pool)
        .await
    }

    /// Delete requests with no remaining jobs and nothing more wanted.
    pub async fn delete_orphaned(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM generation_requests r \
             WHERE r.n = 0 \
               AND NOT EXISTS (SELECT 1 FROM generation_jobs j WHERE j.request_id = r.id)",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
