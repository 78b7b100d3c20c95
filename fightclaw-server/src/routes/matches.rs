use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use fightclaw_engine::{self as engine, Move};

use crate::actors::match_actor::Status;
use crate::auth::AuthedAgent;
use crate::error::{ApiError, AppError};
use crate::ids::parse_match_id;
use crate::models::{match_event, match_player};
use crate::request_id::RequestId;
use crate::routes::attach_request_id;
use crate::services::sse::ServerEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(rename = "moveId")]
    move_id: Uuid,
    #[serde(rename = "expectedVersion")]
    expected_version: u64,
    #[serde(rename = "move")]
    mv: Move,
}

pub async fn submit_move(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    agent: AuthedAgent,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let req: MoveRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidMovePayload(e.to_string()).with_request_id(request_id.to_string()))?;

    let telemetry = crate::auth::validated_runner_telemetry(&state, &headers, agent.agent_id)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let handle = state.registry.get_or_spawn(match_id).await;
    let result = handle
        .submit_move(agent.agent_id, req.move_id, req.expected_version, req.mv)
        .await;

    // Runner telemetry is recorded best-effort and never gates the move
    // response (spec §6.3 is additive metadata, not part of the move
    // contract).
    if result.status == StatusCode::OK {
        if let Some(telemetry) = telemetry {
            let row = match_player::RunnerTelemetry {
                model_provider: telemetry.model_provider,
                model_id: telemetry.model_id,
                prompt_version_id: telemetry.prompt_version_id,
                inference_ms: telemetry.inference_ms,
                tokens_in: telemetry.tokens_in,
                tokens_out: telemetry.tokens_out,
            };
            if let Err(e) = match_player::apply_runner_telemetry(&state.db, match_id, agent.agent_id, &row).await {
                tracing::warn!("failed to record runner telemetry for match {match_id}: {e}");
            }
        }
    }

    Ok((result.status, Json(attach_request_id(result.body, &request_id))))
}

#[derive(Debug, Deserialize, Default)]
pub struct FinishRequest {
    #[allow(dead_code)]
    reason: Option<String>,
    #[serde(rename = "agentId")]
    agent_id: Option<Uuid>,
}

/// Admin-initiated finish (spec §4.2 `finish`, §6.1 "admin-key + agent
/// attribution"). The admin operator names which participant forfeits; if
/// omitted, the side whose turn it currently is forfeits (mirroring the
/// turn-timeout forfeit target).
pub async fn finish(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    _admin: crate::auth::AdminKey,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let req: FinishRequest = if body.is_empty() {
        FinishRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidFinishPayload(e.to_string()).with_request_id(request_id.to_string()))?
    };

    let handle = state.registry.get_or_spawn(match_id).await;

    let forfeiting_agent = match req.agent_id {
        Some(agent_id) => agent_id,
        None => {
            let current = handle
                .state()
                .await
                .ok_or_else(|| AppError::MatchNotInitialized.with_request_id(request_id.to_string()))?;
            engine::current_player(&current.game)
        }
    };

    let result = handle
        .finish(forfeiting_agent, req.reason)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;
    Ok(Json(json!({"ok": true, "state": result})))
}

pub async fn state(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let handle = state.registry.get_or_spawn(match_id).await;
    let current = handle.state().await;
    Ok(Json(json!({"ok": true, "state": current})))
}

pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(request_id): Extension<RequestId>,
    agent: AuthedAgent,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let handle = state.registry.get_or_spawn(match_id).await;
    let (initial, mut rx) = handle
        .stream(agent.agent_id)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let initial_frames: Vec<Event> = match &initial {
        Some(s) => {
            let mut frames = ServerEvent::State { match_id, state: s.clone() }.to_sse_events();
            if s.status == Status::Active && engine::current_player(&s.game) == agent.agent_id {
                frames.extend(
                    ServerEvent::YourTurn { match_id, state_version: s.state_version }.to_sse_events(),
                );
            }
            frames
        }
        None => Vec::new(),
    };

    let tail = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            for frame in event.to_sse_events() {
                yield Ok::<Event, Infallible>(frame);
            }
        }
    };

    let combined = stream::iter(initial_frames.into_iter().map(Ok)).chain(tail);
    Ok(Sse::new(combined).keep_alive(KeepAlive::default()))
}

/// Spectate is public once a match is featured or ended, and always
/// permitted for an unknown `matchId` — a compatibility hack spec §9 open
/// questions carries forward deliberately (200-then-empty-stream rather
/// than 404). Otherwise it requires the admin key.
async fn check_spectate_visibility(
    state: &AppState,
    match_id: Uuid,
    current: &Option<crate::actors::match_actor::MatchState>,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    if current.is_none() {
        return Ok(());
    }
    let is_ended = current.as_ref().is_some_and(|s| s.status == Status::Ended);
    if is_ended {
        return Ok(());
    }

    let featured = state.matchmaker.featured().await;
    if featured.match_id == Some(match_id) {
        return Ok(());
    }

    let presented = headers.get("x-admin-key").and_then(|v| v.to_str().ok());
    if !state.config.admin_key.is_empty() && presented == Some(state.config.admin_key.as_str()) {
        return Ok(());
    }

    Err(AppError::Forbidden("match is not featured or ended".into()))
}

pub async fn spectate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let handle = state.registry.get_or_spawn(match_id).await;
    let precheck = handle.state().await;
    check_spectate_visibility(&state, match_id, &precheck, &headers)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let (initial, mut rx) = handle.spectate().await;

    let mut initial_frames: Vec<Event> = Vec::new();
    if let Some(s) = &initial {
        initial_frames.extend(ServerEvent::State { match_id, state: s.clone() }.to_sse_events());
        if s.status == Status::Ended {
            let reason = s.game.terminal_reason.clone().unwrap_or_else(|| "unknown".to_string());
            initial_frames.extend(
                ServerEvent::MatchEnded {
                    match_id,
                    winner_agent_id: s.winner_agent_id,
                    loser_agent_id: s.loser_agent_id,
                    reason: reason.clone(),
                    reason_code: reason,
                }
                .to_sse_events(),
            );
        }
    }

    let tail = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            for frame in event.to_sse_events() {
                yield Ok::<Event, Infallible>(frame);
            }
        }
    };

    let combined = stream::iter(initial_frames.into_iter().map(Ok)).chain(tail);
    Ok(Sse::new(combined).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(rename = "afterId")]
    after_id: Option<i64>,
    limit: Option<i64>,
}

pub async fn log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let match_id = parse_match_id(&id).map_err(|e| e.with_request_id(request_id.to_string()))?;
    let handle = state.registry.get_or_spawn(match_id).await;
    let precheck = handle.state().await;
    check_spectate_visibility(&state, match_id, &precheck, &headers)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let rows = match_event::read_after(&state.db, match_id, query.after_id.unwrap_or(0), query.limit.unwrap_or(100))
        .await
        .map_err(AppError::from)
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let events: Vec<Value> = rows
        .into_iter()
        .map(|r| json!({"id": r.id, "ts": r.ts, "eventType": r.event_type, "payload": r.payload_json}))
        .collect();

    Ok(Json(json!({"ok": true, "events": events})))
}
