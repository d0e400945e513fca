//! Server error types.

use crate::config::ConfigError;
use hyper::StatusCode;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] tablewire_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] tablewire_store::StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),
}

impl ServerError {
    /// Converts to the HTTP status returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Protocol(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Store(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Body(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewire_protocol::ProtocolError;

    #[test]
    fn test_status_codes() {
        let err: ServerError = ProtocolError::InvalidIndex {
            key: "columns[abc][data]".to_string(),
            index: "abc".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("protocol error"));

        let err = ServerError::BodyTooLarge { limit: 10 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.to_string().contains("10"));

        let err: ServerError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
