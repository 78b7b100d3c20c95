use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// Current featured match, if any (spec §6.1 `/v1/featured`). Public,
/// no auth required — this is the rotating "match of the moment" surfaced
/// to spectators.
pub async fn featured(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.matchmaker.featured().await;
    Json(json!({
        "ok": true,
        "matchId": snapshot.match_id,
        "status": snapshot.status,
        "players": snapshot.players,
    }))
}

/// Snapshot of the featured match's live state, used by spectators that
/// want the current board without opening an SSE connection (spec §6.1
/// `/v1/live`).
pub async fn live(State(state): State<AppState>) -> impl IntoResponse {
    let (match_id, game_state) = state.matchmaker.live().await;
    Json(json!({
        "ok": true,
        "matchId": match_id,
        "state": game_state,
    }))
}
