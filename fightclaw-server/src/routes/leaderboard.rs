use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::leaderboard as leaderboard_model;
use crate::request_id::RequestId;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<i64>,
}

/// Top-N agents by ELO rating (spec §6.1 `/v1/leaderboard`). Public, no
/// auth required.
pub async fn leaderboard(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = leaderboard_model::select_top(&state.db, query.limit.unwrap_or(50))
        .await
        .map_err(crate::error::AppError::from)
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    Ok(Json(json!({"ok": true, "leaderboard": rows})))
}
