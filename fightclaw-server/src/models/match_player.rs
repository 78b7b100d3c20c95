use uuid::Uuid;

use crate::db::DbPool;

pub struct NewMatchPlayer {
    pub agent_id: Uuid,
    pub seat: i16,
    pub starting_rating: i32,
    pub prompt_version_id: Option<String>,
}

pub async fn insert_players(
    pool: &DbPool,
    match_id: Uuid,
    players: &[NewMatchPlayer],
) -> Result<(), sqlx::Error> {
    for p in players {
        sqlx::query(
            "INSERT INTO match_players (match_id, agent_id, seat, starting_rating, prompt_version_id) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (match_id, agent_id) DO NOTHING",
        )
        .bind(match_id)
        .bind(p.agent_id)
        .bind(p.seat)
        .bind(p.starting_rating)
        .bind(&p.prompt_version_id)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Telemetry headers are written with a COALESCE-preserving update — first
/// non-null value wins (spec §6.3).
pub struct RunnerTelemetry {
    pub model_provider: Option<String>,
    pub model_id: Option<String>,
    pub prompt_version_id: Option<String>,
    pub inference_ms: Option<i64>,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
}

pub async fn apply_runner_telemetry(
    pool: &DbPool,
    match_id: Uuid,
    agent_id: Uuid,
    telemetry: &RunnerTelemetry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE match_players SET \
         model_provider = COALESCE(model_provider, $3), \
         model_id = COALESCE(model_id, $4), \
         prompt_version_id = COALESCE(prompt_version_id, $5), \
         inference_ms = COALESCE(inference_ms, $6), \
         tokens_in = COALESCE(tokens_in, $7), \
         tokens_out = COALESCE(tokens_out, $8) \
         WHERE match_id = $1 AND agent_id = $2",
    )
    .bind(match_id)
    .bind(agent_id)
    .bind(&telemetry.model_provider)
    .bind(&telemetry.model_id)
    .bind(&telemetry.prompt_version_id)
    .bind(telemetry.inference_ms)
    .bind(telemetry.tokens_in)
    .bind(telemetry.tokens_out)
    .execute(pool)
    .await?;
    Ok(())
}
