//! Error types surfaced by the gateway facade.

use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::StoreError;
use crate::retrieval::RetrievalError;
use crate::transport::TransportError;

/// Errors returned by [`Gateway`](crate::Gateway) operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The username is already registered.
    #[error("username already exists: {0}")]
    AlreadyExists(String),

    /// Unknown username or wrong password. Which one is not revealed.
    #[error("authentication failed: invalid username or password")]
    AuthFailure,

    /// Any other credential store failure.
    #[error(transparent)]
    Store(StoreError),

    /// Sending failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Fetching failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(username) => Self::AlreadyExists(username),
            other => Self::Store(other),
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_is_lifted() {
        let err = GatewayError::from(StoreError::AlreadyExists("alice".to_string()));
        assert!(matches!(err, GatewayError::AlreadyExists(ref u) if u == "alice"));

        let err = GatewayError::from(StoreError::InvalidPassword);
        assert!(matches!(err, GatewayError::Store(StoreError::InvalidPassword)));
    }

    #[test]
    fn test_messages_keep_layer_prefix() {
        let err = GatewayError::from(TransportError::ConnectFailed("refused".to_string()));
        assert_eq!(err.to_string(), "connection failed: refused");

        let err = GatewayError::from(RetrievalError::FetchFailed("NO".to_string()));
        assert_eq!(err.to_string(), "fetch failed: NO");
    }
}
