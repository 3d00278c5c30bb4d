// HTTP mapping of `maieutic_contracts::error::CoreError` (§7). Every handler returns
// `Result<T, ApiError>`; this is the crate's single place that turns the domain taxonomy
// into status codes and a uniform JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use maieutic_contracts::error::CoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            CoreError::MissingParameter(_) => (StatusCode::BAD_REQUEST, "missing_parameter"),
            CoreError::InvalidResolution(_) => (StatusCode::BAD_REQUEST, "invalid_resolution"),
            CoreError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "unsupported_format"),
            CoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            CoreError::UnknownProject(_) => (StatusCode::NOT_FOUND, "unknown_project"),
            CoreError::UnknownSession(_) => (StatusCode::NOT_FOUND, "unknown_session"),
            CoreError::UnknownConflict(_) => (StatusCode::NOT_FOUND, "unknown_conflict"),
            CoreError::UnknownSpecification(_) => (StatusCode::NOT_FOUND, "unknown_specification"),
            CoreError::UnknownUser(_) => (StatusCode::NOT_FOUND, "unknown_user"),
            CoreError::UnknownAgent(_) => (StatusCode::NOT_FOUND, "unknown_agent"),
            CoreError::ProjectBlocked { .. } => (StatusCode::CONFLICT, "project_blocked"),
            CoreError::SessionEnded => (StatusCode::CONFLICT, "session_ended"),
            CoreError::LlmRateLimited => (StatusCode::TOO_MANY_REQUESTS, "llm_rate_limited"),
            CoreError::LlmTimeout => (StatusCode::GATEWAY_TIMEOUT, "llm_timeout"),
            CoreError::LlmInvalidResponse(_) => (StatusCode::BAD_GATEWAY, "llm_invalid_response"),
            CoreError::LlmProviderError(_) => (StatusCode::BAD_GATEWAY, "llm_provider_error"),
            CoreError::LlmUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_unavailable"),
            CoreError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded"),
            CoreError::Internal { incident_id, .. } => {
                tracing::error!(%incident_id, error = %self.0, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        let message = match &self.0 {
            CoreError::Internal { incident_id, .. } => format!("internal error [{incident_id}]"),
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
