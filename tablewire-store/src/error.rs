//! Store error types.

use thiserror::Error;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid search pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl StoreError {
    /// Returns whether the error was caused by the request rather than the
    /// store itself.
    pub fn is_client_error(&self) -> bool {
        match self {
            StoreError::InvalidPattern { .. } => true,
            StoreError::Io(_) | StoreError::Json(_) => false,
        }
    }
}
