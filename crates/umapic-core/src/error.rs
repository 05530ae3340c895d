//! Error types for the Umapic service.

use thiserror::Error;

use crate::cursor::CursorError;

/// Result type alias using Umapic's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Umapic operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No record exists for the (user, record) pair
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Request failed validation before reaching storage
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Pagination cursor could not be decoded or verified
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// Identity header missing
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Validation failure without structured details.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: None,
        }
    }
}
