//! Error types for the remote store crate.

use stockroom_core::errors::PersistenceError;
use thiserror::Error;

/// Result type alias for remote store operations.
pub type Result<T> = std::result::Result<T, RemoteStoreError>;

/// Errors that can occur while talking to the remote store API.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl RemoteStoreError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<RemoteStoreError> for PersistenceError {
    fn from(err: RemoteStoreError) -> Self {
        match err.status_code() {
            Some(status) => PersistenceError::remote_with_status(status, err.to_string()),
            None => PersistenceError::remote(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_persistence_error_with_status() {
        let err: PersistenceError = RemoteStoreError::api(500, "boom").into();
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn auth_error_maps_without_status() {
        let err: PersistenceError = RemoteStoreError::auth("no token").into();
        assert_eq!(err.status_code(), None);
    }
}
