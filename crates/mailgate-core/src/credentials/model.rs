//! User record types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PasswordVerifier, StoreError};

/// Row id of a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user. Created once, never modified.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Row id.
    pub id: UserId,
    /// Unique, case-sensitive username.
    pub username: String,
    /// Argon2 PHC string.
    pub password_verifier: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Returns true if `password` matches this record's verifier.
    ///
    /// The check runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Verifier`] if the check could not run.
    pub async fn verifies(&self, password: &str) -> Result<bool, StoreError> {
        PasswordVerifier::spawn_verify(&self.password_verifier, password).await
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
