//! Credential Store: user records with password verifiers.

mod model;
mod store;
mod verifier;

pub use model::{UserId, UserRecord};
pub use store::CredentialStore;
pub use verifier::PasswordVerifier;

use thiserror::Error;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 64;

/// Errors raised by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The username is already registered.
    #[error("username already exists: {0}")]
    AlreadyExists(String),

    /// The username is empty, too long, or contains whitespace or control
    /// characters.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// The password is empty.
    #[error("invalid password: must not be empty")]
    InvalidPassword,

    /// The verifier could not be computed.
    #[error("password verifier error: {0}")]
    Verifier(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checks the username rules enforced at registration.
///
/// # Errors
///
/// Returns [`StoreError::InvalidUsername`] describing the first rule broken.
pub fn validate_username(username: &str) -> Result<(), StoreError> {
    if username.is_empty() {
        return Err(StoreError::InvalidUsername("must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(StoreError::InvalidUsername(format!(
            "longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::InvalidUsername(
            "contains whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

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
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Ålice.o'neil").is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN)).is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username("tab\there").is_err());
        assert!(validate_username("nul\0").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }
}
