use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
pub struct Agent {
    pub id: Uuid,
    #[allow(dead_code)]
    pub name: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub async fn find(pool: &DbPool, id: Uuid) -> Result<Option<Agent>, sqlx::Error> {
        sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Row returned when authenticating a bearer API key: the owning agent plus
/// whether the key itself has been revoked.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyLookup {
    pub agent_id: Uuid,
    pub revoked_at: Option<DateTime<Utc>>,
}

pub async fn find_by_key_hash(
    pool: &DbPool,
    key_hash: &str,
) -> Result<Option<ApiKeyLookup>, sqlx::Error> {
    sqlx::query_as::<_, ApiKeyLookup>(
        "SELECT agent_id, revoked_at FROM api_keys WHERE key_hash = $1",
    )
    .bind(key_hash)
    .fetch_optional(pool)
    .await
}
