use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::ids::RunnerId;
use crate::models::agent;
use crate::models::runner_ownership;
use crate::AppState;

fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected Bearer token".into()))
}

/// An authenticated, verified, non-disabled agent (spec §6.1 "agent,
/// verified" routes). Resolved from the `Authorization: Bearer <apiKey>`
/// header by hashing the presented key and looking it up in `api_keys`,
/// mirroring the narrow SQL surface of spec §4.4 — the key derivation and
/// pepper scheme itself belong to the out-of-scope registration service.
pub struct AuthedAgent {
    pub agent_id: Uuid,
}

impl FromRequestParts<AppState> for AuthedAgent {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let key_hash = hash_key(token);

        let lookup = agent::find_by_key_hash(&state.db, &key_hash)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown api key".into()))?;
        if lookup.revoked_at.is_some() {
            return Err(AppError::Unauthorized("api key revoked".into()));
        }

        let record = agent::Agent::find(&state.db, lookup.agent_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown agent".into()))?;
        if record.disabled_at.is_some() {
            return Err(AppError::AgentDisabled);
        }
        if record.verified_at.is_none() {
            return Err(AppError::AgentNotVerified);
        }

        Ok(AuthedAgent { agent_id: record.id })
    }
}

/// Validates `x-admin-key` against the configured shared secret (spec
/// §6.1 "admin-key + agent attribution" auth on `/finish`).
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing x-admin-key".into()))?;
        if state.config.admin_key.is_empty() || presented != state.config.admin_key {
            return Err(AppError::Unauthorized("invalid admin key".into()));
        }
        Ok(AdminKey)
    }
}

/// Optional runner move telemetry forwarded via headers (spec §6.3) into
/// `match_players` columns. Absent unless the caller is the runner surface.
#[derive(Debug, Default, Clone)]
pub struct RunnerTelemetry {
    pub model_provider: Option<String>,
    pub model_id: Option<String>,
    pub prompt_version_id: Option<String>,
    pub inference_ms: Option<i64>,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
}

impl RunnerTelemetry {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let str_header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let int_header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).and_then(|s| s.parse().ok());
        RunnerTelemetry {
            model_provider: str_header("x-fc-model-provider"),
            model_id: str_header("x-fc-model-id"),
            prompt_version_id: str_header("x-fc-prompt-version-id"),
            inference_ms: int_header("x-fc-inference-ms"),
            tokens_in: int_header("x-fc-tokens-in"),
            tokens_out: int_header("x-fc-tokens-out"),
        }
    }
}

/// Agents act under their own Bearer key; a runner process that submitted
/// the move on an agent's behalf identifies itself additionally via
/// `x-runner-key`/`x-runner-id` so its telemetry headers (spec §6.3) can be
/// attributed. When those headers are present, ownership must check out or
/// the whole request is rejected with `runner_agent_not_bound`; when
/// they're absent, no telemetry is recorded.
pub async fn validated_runner_telemetry(
    state: &AppState,
    headers: &HeaderMap,
    agent_id: Uuid,
) -> Result<Option<RunnerTelemetry>, AppError> {
    if !headers.contains_key("x-runner-key") {
        return Ok(None);
    }

    let presented = headers
        .get("x-runner-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("malformed x-runner-key".into()))?;
    if state.config.runner_key.is_empty() || presented != state.config.runner_key {
        return Err(AppError::Unauthorized("invalid runner key".into()));
    }

    let raw_runner_id = headers
        .get("x-runner-id")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidRunnerId)?;
    let runner_id = RunnerId::parse(raw_runner_id).ok_or(AppError::InvalidRunnerId)?;

    let bound = runner_ownership::is_bound(&state.db, runner_id.as_str(), agent_id).await?;
    if !bound {
        return Err(AppError::RunnerAgentNotBound);
    }

    Ok(Some(RunnerTelemetry::from_headers(headers)))
}
