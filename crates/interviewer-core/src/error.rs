//! Error types for the interview engine and its gateways.
//!
//! `GatewayError` lives in `interviewer-core` so the planner can downcast the
//! `anyhow::Error` returned by a port and classify it for retry decisions
//! without string matching.

use thiserror::Error;

use crate::model::InterviewStatus;

/// Errors surfaced by the interview engine's public operations.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// A referenced interview, question, answer, or follow-up does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The interview is in the wrong lifecycle state for the requested operation.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: InterviewStatus,
        to: InterviewStatus,
    },

    /// Adaptive evaluation was requested on a question without a usable reference answer.
    #[error("question {question_id} has no reference answer")]
    NotPlanned { question_id: String },

    /// A language-model or embedding call failed.
    #[error("gateway call `{operation}` failed: {message}")]
    ExternalGateway {
        operation: &'static str,
        message: String,
    },

    /// A repository call failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller supplied unusable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl InterviewError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        InterviewError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn gateway(operation: &'static str, err: &anyhow::Error) -> Self {
        InterviewError::ExternalGateway {
            operation,
            message: format!("{err:#}"),
        }
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        InterviewError::Storage(format!("{err:#}"))
    }
}

/// Shorthand result type for engine operations.
pub type InterviewResult<T> = std::result::Result<T, InterviewError>;

/// Errors that can occur when talking to a language-model or embedding backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend answered, but not in the shape we asked for.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthenticationFailed(_) | GatewayError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GatewayError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors_are_classified() {
        assert!(GatewayError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(GatewayError::ModelNotFound("gpt-x".into()).is_permanent());
        assert!(!GatewayError::Timeout(30).is_permanent());
        assert!(!GatewayError::RateLimited { retry_after_ms: 10 }.is_permanent());
    }

    #[test]
    fn downcast_through_anyhow() {
        let err: anyhow::Error = GatewayError::RateLimited {
            retry_after_ms: 2500,
        }
        .into();
        let classified = err.downcast_ref::<GatewayError>().unwrap();
        assert_eq!(classified.retry_after_ms(), Some(2500));
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = InterviewError::InvalidStateTransition {
            from: InterviewStatus::Ready,
            to: InterviewStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition: READY -> COMPLETED"
        );
    }
}
