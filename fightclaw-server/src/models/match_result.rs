use uuid::Uuid;

use crate::db::DbPool;

/// `INSERT OR IGNORE` serialization point for finalization (spec §4.2 step
/// 3, §9 "ELO update atomicity"). Returns whether this call performed the
/// insert (i.e. this caller is the first finalizer).
pub async fn insert_ignore(
    pool: &DbPool,
    match_id: Uuid,
    winner_agent_id: Option<Uuid>,
    loser_agent_id: Option<Uuid>,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO match_results (match_id, winner_agent_id, loser_agent_id, reason) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (match_id) DO NOTHING",
    )
    .bind(match_id)
    .bind(winner_agent_id)
    .bind(loser_agent_id)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn exists(pool: &DbPool, match_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT 1 FROM match_results WHERE match_id = $1")
            .bind(match_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}
