//! Error taxonomy and shared result type
//!
//! Every failure a handler can produce maps onto exactly one variant here,
//! and every variant maps onto exactly one HTTP status. Handlers convert
//! errors to responses at the edge; nothing is retried internally.

use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Stride error type
#[derive(Debug, Error)]
pub enum StrideError {
    /// Malformed, missing, or out-of-range input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing or unverifiable credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Resource exists but the caller does not own it (403)
    #[error("{0}")]
    Forbidden(String),

    /// Resource or prerequisite resource absent (404)
    #[error("{0}")]
    NotFound(String),

    /// State already satisfies a uniqueness or stage constraint (409)
    #[error("{0}")]
    Conflict(String),

    /// Resource is owned and present but in the wrong lifecycle stage (400)
    #[error("{0}")]
    State(String),

    /// Malformed HTTP payload (400)
    #[error("{0}")]
    Http(String),

    /// Store failed unexpectedly (500); detail is logged, never returned
    #[error("database error: {0}")]
    Database(String),

    /// Store connection lost (503)
    #[error("Database connection lost")]
    DatabaseUnavailable,

    /// Anything unclassified (500); detail is logged, never returned
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrideError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            StrideError::Validation(_) | StrideError::State(_) | StrideError::Http(_) => {
                StatusCode::BAD_REQUEST
            }
            StrideError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StrideError::Forbidden(_) => StatusCode::FORBIDDEN,
            StrideError::NotFound(_) => StatusCode::NOT_FOUND,
            StrideError::Conflict(_) => StatusCode::CONFLICT,
            StrideError::Database(_) | StrideError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StrideError::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the caller may see this error's message verbatim.
    ///
    /// 5xx detail stays in the logs; callers get a fixed safe message
    /// chosen by the handler.
    pub fn is_safe_for_client(&self) -> bool {
        !matches!(
            self,
            StrideError::Database(_) | StrideError::Internal(_)
        )
    }
}

impl From<std::io::Error> for StrideError {
    fn from(e: std::io::Error) -> Self {
        StrideError::Internal(format!("I/O error: {}", e))
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = StrideError> = std::result::Result<T, E>;

/// Wire shape for all error responses: `{ "error": { "message": "..." } }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StrideError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StrideError::State("inactive".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StrideError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StrideError::Forbidden("not yours".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            StrideError::NotFound("missing".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StrideError::Conflict("exists".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StrideError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            StrideError::DatabaseUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_server_errors_are_not_client_safe() {
        assert!(!StrideError::Database("connection reset".into()).is_safe_for_client());
        assert!(!StrideError::Internal("panic".into()).is_safe_for_client());
        assert!(StrideError::Validation("bad input".into()).is_safe_for_client());
        assert!(StrideError::DatabaseUnavailable.is_safe_for_client());
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody::new("Challenge not found");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["message"], "Challenge not found");
    }
}
