//! Common error types for vocabulary curation

use thiserror::Error;

/// Common result type for curation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the curation crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema document is unreadable or malformed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Confidence value or threshold table outside the policy's domain
    #[error("Policy error: {0}")]
    Policy(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
