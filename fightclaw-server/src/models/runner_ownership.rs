use uuid::Uuid;

use crate::db::DbPool;

/// Checks `runner_agent_ownership` for a live (non-revoked) binding, per
/// spec §6.3's runner-to-agent ownership requirement.
pub async fn is_bound(pool: &DbPool, runner_id: &str, agent_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM runner_agent_ownership \
         WHERE runner_id = $1 AND agent_id = $2 AND revoked_at IS NULL",
    )
    .bind(runner_id)
    .bind(agent_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}
