use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wire-stable error taxonomy (spec §7). Variants map 1:1 onto the `code`
/// field of the `{ok:false, error, code, requestId}` envelope.
#[derive(Debug, Clone)]
pub enum AppError {
    InvalidMovePayload(String),
    InvalidFinishPayload(String),
    InvalidMatchId,
    InvalidRunnerId,
    Unauthorized(String),
    Forbidden(String),
    AgentNotVerified,
    AgentDisabled,
    RunnerAgentNotBound,
    MatchNotInitialized,
    NotYourTurn,
    AlreadyMatched,
    RateLimited,
    ServiceUnavailable(String),
    Internal(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl AppError {
    /// Convenience for route handlers that already have a `RequestId` in
    /// scope (spec §6.1 "Every response carries x-request-id").
    pub fn with_request_id(self, request_id: impl Into<String>) -> ApiError {
        ApiError::new(self).with_request_id(request_id)
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidMovePayload(_) => "invalid_move_payload",
            AppError::InvalidFinishPayload(_) => "invalid_finish_payload",
            AppError::InvalidMatchId => "invalid_match_id",
            AppError::InvalidRunnerId => "invalid_runner_id",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::AgentNotVerified => "agent_not_verified",
            AppError::AgentDisabled => "agent_disabled",
            AppError::RunnerAgentNotBound => "runner_agent_not_bound",
            AppError::MatchNotInitialized => "match_not_initialized",
            AppError::NotYourTurn => "not_your_turn",
            AppError::AlreadyMatched => "already_matched",
            AppError::RateLimited => "rate_limited",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Internal(_) => "internal_error",
            AppError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidMovePayload(_)
            | AppError::InvalidFinishPayload(_)
            | AppError::InvalidMatchId
            | AppError::InvalidRunnerId => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::AgentNotVerified
            | AppError::AgentDisabled
            | AppError::RunnerAgentNotBound => StatusCode::FORBIDDEN,
            AppError::MatchNotInitialized | AppError::NotYourTurn | AppError::AlreadyMatched => {
                StatusCode::CONFLICT
            }
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidMovePayload(m) | AppError::InvalidFinishPayload(m) => m.clone(),
            AppError::Unauthorized(m) | AppError::Forbidden(m) => m.clone(),
            AppError::ServiceUnavailable(m) => m.clone(),
            AppError::Internal(m) => m.clone(),
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                "internal server error".to_string()
            }
            other => other.code().replace('_', " "),
        }
    }
}

/// Request-id-carrying API error. Produces the `{ok:false, error, code,
/// requestId}` envelope used by every agent-facing route (spec §6.1).
#[derive(Debug, Clone)]
pub struct ApiError {
    pub inner: AppError,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(inner: AppError) -> Self {
        ApiError { inner, request_id: None }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError::new(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::new(AppError::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.inner.status();
        let body = json!({
            "ok": false,
            "error": self.inner.message(),
            "code": self.inner.code(),
            "requestId": self.request_id,
        });
        (status, Json(body)).into_response()
    }
}
