use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::config::ELO_START;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct LeaderboardRow {
    pub agent_id: Uuid,
    pub rating: i32,
    pub wins: i32,
    pub losses: i32,
    pub games_played: i32,
    #[serde(skip)]
    #[allow(dead_code)]
    pub updated_at: DateTime<Utc>,
}

pub async fn rating_of(pool: &DbPool, agent_id: Uuid) -> Result<i32, sqlx::Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT rating FROM leaderboard WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(r,)| r).unwrap_or(ELO_START))
}

pub async fn upsert_start(pool: &DbPool, agent_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO leaderboard (agent_id, rating) VALUES ($1, $2) \
         ON CONFLICT (agent_id) DO NOTHING",
    )
    .bind(agent_id)
    .bind(ELO_START)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn apply_rating_delta(
    pool: &DbPool,
    agent_id: Uuid,
    new_rating: i32,
    wins_delta: i32,
    losses_delta: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE leaderboard SET rating = $2, wins = wins + $3, losses = losses + $4, \
         games_played = games_played + 1, updated_at = NOW() \
         WHERE agent_id = $1",
    )
    .bind(agent_id)
    .bind(new_rating)
    .bind(wins_delta)
    .bind(losses_delta)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn select_top(pool: &DbPool, limit: i64) -> Result<Vec<LeaderboardRow>, sqlx::Error> {
    let limit = limit.clamp(1, 200);
    sqlx::query_as::<_, LeaderboardRow>(
        "SELECT * FROM leaderboard ORDER BY rating DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
