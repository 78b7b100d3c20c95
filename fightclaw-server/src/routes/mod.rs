pub mod featured;
pub mod leaderboard;
pub mod matches;
pub mod queue;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::request_id::{self, RequestId};
use crate::AppState;

/// Inserts `requestId` into a response body that doesn't already carry one.
/// Used by handlers that build their body deep inside an actor (which has
/// no `RequestId` in scope) rather than via `AppError::with_request_id`.
pub fn attach_request_id(mut body: serde_json::Value, request_id: &RequestId) -> serde_json::Value {
    if let Some(obj) = body.as_object_mut() {
        obj.entry("requestId").or_insert_with(|| serde_json::json!(request_id.to_string()));
    }
    body
}

/// Builds the `/v1` agent-facing HTTP surface (spec §6.1). Route handlers
/// are thin: they extract identity/params and delegate to the
/// MatchActor/MatchmakerActor handles carried in `AppState`.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/queue/join", post(queue::join))
        .route("/queue/status", get(queue::status))
        .route("/queue/leave", delete(queue::leave))
        .route("/events/wait", get(queue::wait))
        .route("/matches/{id}/move", post(matches::submit_move))
        .route("/matches/{id}/finish", post(matches::finish))
        .route("/matches/{id}/state", get(matches::state))
        .route("/matches/{id}/stream", get(matches::stream))
        .route("/matches/{id}/spectate", get(matches::spectate))
        .route("/matches/{id}/log", get(matches::log))
        .route("/featured", get(featured::featured))
        .route("/live", get(featured::live))
        .route("/leaderboard", get(leaderboard::leaderboard));

    Router::new()
        .nest("/v1", v1)
        .layer(middleware::from_fn(request_id::assign_request_id))
        .with_state(state)
}
