use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
pub struct MatchEventRow {
    pub id: i64,
    #[allow(dead_code)]
    pub match_id: Uuid,
    #[allow(dead_code)]
    pub turn: i64,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub payload_json: serde_json::Value,
}

/// Append-only log, used only for history queries — never for state
/// recovery (spec §9 "Durable state").
pub async fn append(
    pool: &DbPool,
    match_id: Uuid,
    turn: i64,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO match_events (match_id, turn, event_type, payload_json) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(match_id)
    .bind(turn)
    .bind(event_type)
    .bind(payload)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn read_after(
    pool: &DbPool,
    match_id: Uuid,
    after_id: i64,
    limit: i64,
) -> Result<Vec<MatchEventRow>, sqlx::Error> {
    let limit = limit.clamp(1, 5000);
    sqlx::query_as::<_, MatchEventRow>(
        "SELECT * FROM match_events WHERE match_id = $1 AND id > $2 ORDER BY id ASC LIMIT $3",
    )
    .bind(match_id)
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
