//! Application error types and result alias.

use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
///
/// Business-rule failures of a refresh are accumulated as strings on a
/// [`RefreshOutcome`](crate::models::refresh::RefreshOutcome); these variants
/// cover contract violations and collaborator failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict error (e.g., two projects claiming the same coordinates)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Artifact repository client failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Document store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Notification queue failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Malformed artifact content
    #[error("Failed to extract artifacts from {file}: {message}")]
    Extraction { file: String, message: String },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build an extraction error for the named file.
    pub fn extraction(file: impl Into<String>, message: impl ToString) -> Self {
        AppError::Extraction {
            file: file.into(),
            message: message.to_string(),
        }
    }
}
