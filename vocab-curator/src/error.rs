//! Error types for vocab-curator
//!
//! [`CurationError`] is returned by the collaborators and the workflow;
//! [`ApiError`] is what HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Collaborator and workflow errors
#[derive(Debug, Error)]
pub enum CurationError {
    /// Table or column name that is not a plain identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Table, column or review item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// vocab-common error
    #[error(transparent)]
    Common(#[from] vocab_common::Error),

    /// Blocking evaluation task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for CurationError {
    fn from(err: serde_json::Error) -> Self {
        CurationError::Common(vocab_common::Error::Json(err))
    }
}

impl From<tokio::task::JoinError> for CurationError {
    fn from(err: tokio::task::JoinError) -> Self {
        CurationError::Task(err.to_string())
    }
}

/// Result type for collaborators and the workflow
pub type CurationResult<T> = Result<T, CurationError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., a run already active for the table
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// vocab-common error
    #[error("Common error: {0}")]
    Common(#[from] vocab_common::Error),
}

impl From<CurationError> for ApiError {
    fn from(err: CurationError) -> Self {
        match err {
            CurationError::InvalidIdentifier(msg) => ApiError::BadRequest(msg),
            CurationError::NotFound(msg) => ApiError::NotFound(msg),
            CurationError::Conflict(msg) => ApiError::Conflict(msg),
            CurationError::Database(e) => ApiError::Database(e),
            CurationError::Common(e) => ApiError::Common(e),
            CurationError::Task(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(vocab_common::Error::InvalidInput(ref msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
