// Domain error taxonomy, surface-independent.
//
// Every crate above this one converts into `CoreError` at its boundary.
// `BlockedByQuality` is deliberately NOT a variant here: blocking is a structured
// response, not an exception - see `maieutic_core::quality::PreValidation` /
// `OrchestratorOutcome::Blocked`.

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unknown project: {0}")]
    UnknownProject(Uuid),

    #[error("unknown session: {0}")]
    UnknownSession(Uuid),

    #[error("unknown conflict: {0}")]
    UnknownConflict(Uuid),

    #[error("unknown specification: {0}")]
    UnknownSpecification(Uuid),

    #[error("unknown user: {0}")]
    UnknownUser(Uuid),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("project is blocked by {count} pending conflict(s) on the requested key(s)")]
    ProjectBlocked { count: usize },

    #[error("invalid conflict resolution: {0}")]
    InvalidResolution(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("session has ended and is immutable")]
    SessionEnded,

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("LLM call timed out")]
    LlmTimeout,

    #[error("LLM rate limited")]
    LlmRateLimited,

    #[error("LLM response did not match the expected schema: {0}")]
    LlmInvalidResponse(String),

    #[error("LLM provider error: {0}")]
    LlmProviderError(String),

    #[error("LLM unavailable after exhausting retries: {0}")]
    LlmUnavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error [{incident_id}]")]
    Internal {
        incident_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

impl CoreError {
    /// Wrap an arbitrary error as an internal error, generating an opaque
    /// incident id for the caller while the real cause is logged with
    /// `tracing::error!` by whoever constructs this.
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        CoreError::Internal {
            incident_id: Uuid::new_v4(),
            source: source.into(),
        }
    }

    /// Whether the gateway's retry policy should attempt this error again.
    /// Only the two declared-retryable LLM kinds are retryable; everything
    /// else (including 4xx provider errors) is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::LlmRateLimited | CoreError::LlmUnavailable(_))
    }
}
