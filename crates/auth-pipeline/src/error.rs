//! Error types for pipeline operations
//!
//! `ApiError` is what a caller of the pipeline sees. HTTP-level variants keep
//! the status, a human-readable message and the original JSON payload so the
//! caller can inspect exactly what the backend said. `RefreshError` stays
//! inside the pipeline: it explains why a refresh exchange could not produce a
//! credential.

use serde_json::Value;
use transport::{ApiResponse, TransportFailure, TransportResult};

use crate::classify::{Classification, failure_message};

/// Errors returned to callers of the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client (connect error, timeout)
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    /// The access credential was rejected, absent or expired
    #[error("authentication failed ({status}): {message}")]
    Auth {
        status: u16,
        message: String,
        body: Value,
    },

    /// Well-formed rejection unrelated to auth (4xx, or an embedded error on 2xx)
    #[error("request rejected ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        body: Value,
    },

    /// A successful reply that lacks what the operation needs (e.g. a login with no token)
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The session could not be persisted after a successful login
    #[error("credential store error: {0}")]
    Credential(String),
}

impl ApiError {
    /// Build the caller-facing error for a failed outcome.
    pub fn from_outcome(outcome: TransportResult, classification: Classification) -> Self {
        match outcome {
            Err(failure) => failure.into(),
            Ok(response) => Self::from_response(response, classification),
        }
    }

    fn from_response(response: ApiResponse, classification: Classification) -> Self {
        let message = failure_message(&response);
        let ApiResponse { status, body, .. } = response;
        match classification {
            Classification::AuthFailure => ApiError::Auth {
                status,
                message,
                body,
            },
            _ if status >= 500 => ApiError::Server {
                status,
                message,
                body,
            },
            _ => ApiError::Validation {
                status,
                message,
                body,
            },
        }
    }

    /// Short kind label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport { .. } => "transport",
            ApiError::Auth { .. } => "auth",
            ApiError::Validation { .. } => "validation",
            ApiError::Server { .. } => "server",
            ApiError::MalformedResponse(_) => "malformed_response",
            ApiError::Credential(_) => "credential",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }

    /// The original reply payload, for HTTP-level errors.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Auth { body, .. }
            | ApiError::Validation { body, .. }
            | ApiError::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportFailure> for ApiError {
    fn from(failure: TransportFailure) -> Self {
        ApiError::Transport {
            message: failure.message,
            timed_out: failure.timed_out,
        }
    }
}

/// Why a refresh exchange produced no credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token in the credential store")]
    MissingRefreshToken,

    #[error("refresh token rejected: {0}")]
    Rejected(String),

    #[error("refresh exchange failed: {0}")]
    Exchange(String),

    #[error("refresh reply carried no access token")]
    MalformedResponse,

    /// The credential was cleared by an earlier teardown or logout
    #[error("session already ended")]
    SessionEnded,

    /// The exchange task ended without releasing its waiters
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

impl RefreshError {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshError::MissingRefreshToken => "missing_refresh_token",
            RefreshError::Rejected(_) => "rejected",
            RefreshError::Exchange(_) => "exchange_failed",
            RefreshError::MalformedResponse => "malformed_response",
            RefreshError::SessionEnded => "session_ended",
            RefreshError::Abandoned => "abandoned",
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_failure_maps_to_transport_error() {
        let err = ApiError::from_outcome(
            Err(TransportFailure::timeout("timed out after 10s")),
            Classification::OtherFailure,
        );
        assert_eq!(
            err,
            ApiError::Transport {
                message: "timed out after 10s".into(),
                timed_out: true
            }
        );
        assert_eq!(err.kind(), "transport");
        assert!(err.body().is_none());
    }

    #[test]
    fn auth_failure_preserves_payload() {
        let body = json!({"error": "Invalid token"});
        let err = ApiError::from_outcome(
            Ok(ApiResponse::new(401, body.clone())),
            Classification::AuthFailure,
        );
        assert!(err.is_auth());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some(&body));
        assert_eq!(err.to_string(), "authentication failed (401): Invalid token");
    }

    #[test]
    fn embedded_error_on_200_is_validation() {
        let body = json!({"error": "Folder not found"});
        let err = ApiError::from_outcome(
            Ok(ApiResponse::new(200, body)),
            Classification::OtherFailure,
        );
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.to_string(), "request rejected (200): Folder not found");
    }

    #[test]
    fn five_hundreds_are_server_errors() {
        let err = ApiError::from_outcome(
            Ok(ApiResponse::new(503, json!("maintenance"))),
            Classification::OtherFailure,
        );
        assert_eq!(err.kind(), "server");
        assert_eq!(err.to_string(), "server error (503): maintenance");
    }

    #[test]
    fn four_hundreds_are_validation_errors() {
        let err = ApiError::from_outcome(
            Ok(ApiResponse::new(400, json!({"message": "title is required"}))),
            Classification::OtherFailure,
        );
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("title is required"));
    }

    #[test]
    fn refresh_error_labels() {
        assert_eq!(RefreshError::MissingRefreshToken.label(), "missing_refresh_token");
        assert_eq!(RefreshError::Rejected("x".into()).label(), "rejected");
        assert_eq!(
            RefreshError::Rejected("Invalid refresh token".into()).to_string(),
            "refresh token rejected: Invalid refresh token"
        );
    }
}
