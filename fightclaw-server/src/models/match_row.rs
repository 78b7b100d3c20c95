use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
pub struct MatchRow {
    pub id: Uuid,
    pub status: String,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub winner_agent_id: Option<Uuid>,
    #[allow(dead_code)]
    pub end_reason: Option<String>,
    #[allow(dead_code)]
    pub final_state_version: Option<i64>,
    #[allow(dead_code)]
    pub mode: String,
}

impl MatchRow {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub async fn find(pool: &DbPool, id: Uuid) -> Result<Option<MatchRow>, sqlx::Error> {
        sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

pub async fn insert_active(pool: &DbPool, match_id: Uuid, mode: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO matches (id, status, mode) VALUES ($1, 'active', $2) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(match_id)
    .bind(mode)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_ended(
    pool: &DbPool,
    match_id: Uuid,
    winner_agent_id: Option<Uuid>,
    end_reason: &str,
    final_state_version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE matches SET status = 'ended', \
         ended_at = COALESCE(ended_at, NOW()), \
         winner_agent_id = COALESCE(winner_agent_id, $2), \
         end_reason = COALESCE(end_reason, $3), \
         final_state_version = COALESCE(final_state_version, $4) \
         WHERE id = $1",
    )
    .bind(match_id)
    .bind(winner_agent_id)
    .bind(end_reason)
    .bind(final_state_version)
    .execute(pool)
    .await?;
    Ok(())
}
