use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::actors::matchmaker_actor::{JoinResult, StatusResult};
use crate::auth::AuthedAgent;
use crate::error::{ApiError, AppError};
use crate::request_id::RequestId;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct JoinBody {
    #[serde(default)]
    #[allow(dead_code)]
    mode: Option<String>,
}

pub async fn join(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    agent: AuthedAgent,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Only the "ranked" mode exists (spec §1 non-goals: "supports exactly
    // one game"); the body is accepted but has nothing else to validate.
    if !body.is_empty() {
        let _: JoinBody = serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidMovePayload(e.to_string()).with_request_id(request_id.to_string()))?;
    }

    let result = state.matchmaker.join(agent.agent_id).await;
    match result {
        JoinResult::Ready { match_id, opponent_id } => Ok(Json(
            json!({"ok": true, "status": "ready", "matchId": match_id, "opponentId": opponent_id}),
        )),
        JoinResult::Waiting { match_id } => {
            Ok(Json(json!({"ok": true, "status": "waiting", "matchId": match_id})))
        }
        JoinResult::Unavailable => Err(AppError::ServiceUnavailable("match init failed".into())
            .with_request_id(request_id.to_string())),
    }
}

pub async fn status(
    State(state): State<AppState>,
    agent: AuthedAgent,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.matchmaker.status(agent.agent_id).await;
    Ok(Json(match result {
        StatusResult::Idle => json!({"ok": true, "status": "idle"}),
        StatusResult::Waiting { match_id } => json!({"ok": true, "status": "waiting", "matchId": match_id}),
        StatusResult::Ready { match_id, opponent_id } => {
            json!({"ok": true, "status": "ready", "matchId": match_id, "opponentId": opponent_id})
        }
    }))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    agent: AuthedAgent,
) -> Result<impl IntoResponse, ApiError> {
    match state.matchmaker.leave(agent.agent_id).await {
        Ok(()) => Ok(Json(json!({"ok": true}))),
        Err(_code) => Err(AppError::AlreadyMatched.with_request_id(request_id.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct WaitQuery {
    timeout: Option<u64>,
}

pub async fn wait(
    State(state): State<AppState>,
    agent: AuthedAgent,
    Query(query): Query<WaitQuery>,
) -> impl IntoResponse {
    let timeout = query.timeout.unwrap_or(30).clamp(1, 120);
    let event = state.matchmaker.wait_for_event(agent.agent_id, timeout).await;
    let (name, data) = event.name_and_payload();
    (StatusCode::OK, Json(json!({"ok": true, "event": name, "data": data})))
}
