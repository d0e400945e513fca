//! Protocol error types.

use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur while decoding or encoding protocol documents.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A key starts with a known family (`columns[`, `order[`, `search[`)
    /// but does not carry enough bracketed segments for that family.
    #[error("not enough fields in key {key:?}")]
    InsufficientFields { key: String },

    #[error("invalid index {index:?} in key {key:?}")]
    InvalidIndex { key: String, index: String },

    #[error("index {index} in key {key:?} exceeds maximum {max}")]
    IndexOutOfRange { key: String, index: usize, max: usize },

    #[error("invalid integer {value:?} for {key:?}: {source}")]
    InvalidInteger {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value could not be written as JSON.
    #[error("JSON encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    pub(crate) fn insufficient_fields(key: &str) -> Self {
        ProtocolError::InsufficientFields {
            key: key.to_string(),
        }
    }

    /// Returns whether the error was caused by the peer's input.
    ///
    /// Encode failures and I/O failures while reading JSON are not.
    pub fn is_client_error(&self) -> bool {
        match self {
            ProtocolError::Json(e) => !matches!(e.classify(), serde_json::error::Category::Io),
            ProtocolError::Encode(_) => false,
            _ => true,
        }
    }
}
