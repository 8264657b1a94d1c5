//! Argon2id password verifiers.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString};

use super::StoreError;

/// Builds and checks password verifiers.
///
/// A verifier is an Argon2id PHC string with its own random salt, so equal
/// passwords never produce equal verifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordVerifier;

impl PasswordVerifier {
    /// Derives a verifier from a password.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPassword`] for an empty password and
    /// [`StoreError::Verifier`] if hashing fails.
    pub fn hash(password: &str) -> Result<String, StoreError> {
        if password.is_empty() {
            return Err(StoreError::InvalidPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Verifier(e.to_string()))
    }

    /// Checks a password against a verifier in constant time.
    ///
    /// A malformed verifier never matches.
    #[must_use]
    pub fn verify(verifier: &str, password: &str) -> bool {
        PasswordHash::new(verifier).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Runs [`Self::hash`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// As [`Self::hash`], plus [`StoreError::Verifier`] if the blocking task
    /// panics or is cancelled.
    pub async fn spawn_hash(password: &str) -> Result<String, StoreError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| StoreError::Verifier(e.to_string()))?
    }

    /// Runs [`Self::verify`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Verifier`] if the blocking task panics or is
    /// cancelled.
    pub async fn spawn_verify(verifier: &str, password: &str) -> Result<bool, StoreError> {
        let verifier = verifier.to_owned();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || Self::verify(&verifier, &password))
            .await
            .map_err(|e| StoreError::Verifier(e.to_string()))
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

    #[test]
    fn test_hash_and_verify() {
        let verifier = PasswordVerifier::hash("correct horse").unwrap();
        assert!(verifier.starts_with("$argon2id$"));
        assert!(!verifier.contains("correct horse"));

        assert!(PasswordVerifier::verify(&verifier, "correct horse"));
        assert!(!PasswordVerifier::verify(&verifier, "Correct horse"));
        assert!(!PasswordVerifier::verify(&verifier, ""));
    }

    #[test]
    fn test_salts_differ() {
        let a = PasswordVerifier::hash("same").unwrap();
        let b = PasswordVerifier::hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            PasswordVerifier::hash(""),
            Err(StoreError::InvalidPassword)
        ));
    }

    #[tokio::test]
    async fn test_spawned_hash_and_verify() {
        let verifier = PasswordVerifier::spawn_hash("correct horse").await.unwrap();
        assert!(PasswordVerifier::spawn_verify(&verifier, "correct horse").await.unwrap());
        assert!(!PasswordVerifier::spawn_verify(&verifier, "wrong").await.unwrap());
        assert!(matches!(
            PasswordVerifier::spawn_hash("").await,
            Err(StoreError::InvalidPassword)
        ));
    }

    #[test]
    fn test_malformed_verifier_never_matches() {
        assert!(!PasswordVerifier::verify("plaintext", "plaintext"));
        assert!(!PasswordVerifier::verify("", ""));
    }
}
