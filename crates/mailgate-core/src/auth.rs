//! Account Authenticator.

use tracing::debug;

use crate::credentials::{CredentialStore, StoreError};

/// Checks login attempts against the credential store.
///
/// There is no lockout or rate limiting, and unknown users return sooner
/// than wrong passwords because no hash is computed for them.
#[derive(Debug, Clone)]
pub struct Authenticator {
    store: CredentialStore,
}

impl Authenticator {
    /// Creates an authenticator over a store.
    #[must_use]
    pub const fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Returns true iff `username` exists and `password` matches its
    /// verifier. Usernames compare case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried, so that outages are
    /// not reported as bad credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let Some(record) = self.store.find_by_username(username).await? else {
            debug!(username, "login for unknown user");
            return Ok(false);
        };

        let accepted = record.verifies(password).await?;
        debug!(username, accepted, "login checked");
        Ok(accepted)
    }
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
    use crate::credentials::PasswordVerifier;

    async fn with_user(username: &str, password: &str) -> Authenticator {
        let store = CredentialStore::in_memory().await.unwrap();
        let verifier = PasswordVerifier::hash(password).unwrap();
        store.register(username, &verifier).await.unwrap();
        Authenticator::new(store)
    }

    #[tokio::test]
    async fn test_accepts_matching_password() {
        let auth = with_user("alice", "s3cret").await;
        assert!(auth.authenticate("alice", "s3cret").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_wrong_password_and_unknown_user() {
        let auth = with_user("alice", "s3cret").await;
        assert!(!auth.authenticate("alice", "wrong").await.unwrap());
        assert!(!auth.authenticate("bob", "s3cret").await.unwrap());
    }

    #[tokio::test]
    async fn test_username_case_matters() {
        let auth = with_user("alice", "s3cret").await;
        assert!(!auth.authenticate("Alice", "s3cret").await.unwrap());
    }
}
