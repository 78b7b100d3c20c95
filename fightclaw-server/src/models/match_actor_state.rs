use uuid::Uuid;

use crate::db::DbPool;

pub async fn save(pool: &DbPool, match_id: Uuid, state_json: &serde_json::Value) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO match_actor_state (match_id, state_json, updated_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (match_id) DO UPDATE SET state_json = EXCLUDED.state_json, updated_at = NOW()",
    )
    .bind(match_id)
    .bind(state_json)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load(pool: &DbPool, match_id: Uuid) -> Result<Option<serde_json::Value>, sqlx::Error> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT state_json FROM match_actor_state WHERE match_id = $1")
            .bind(match_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v))
}
