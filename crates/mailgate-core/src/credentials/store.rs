//! SQLite-backed credential storage.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, info};

use super::model::{UserId, UserRecord};
use super::{StoreError, validate_username};

/// The `users` table.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    /// Opens (creating if needed) the database at `database_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub async fn new(database_path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        debug!(path = database_path, "credential store opened");
        Ok(store)
    }

    /// Creates a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // One connection: each in-memory connection is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_verifier TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a new user.
    ///
    /// Uniqueness is decided by the database in the same statement, so
    /// concurrent registrations of one name yield exactly one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the username is taken and
    /// [`StoreError::InvalidUsername`] if it breaks the username rules.
    pub async fn register(
        &self,
        username: &str,
        password_verifier: &str,
    ) -> Result<UserRecord, StoreError> {
        validate_username(username)?;
        let created_at = Utc::now();

        let result = sqlx::query(
            r"
            INSERT INTO users (username, password_verifier, created_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(username)
        .bind(password_verifier)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(StoreError::AlreadyExists(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let id = UserId(result.last_insert_rowid());
        info!(%id, username, "user registered");

        Ok(UserRecord {
            id,
            username: username.to_string(),
            password_verifier: password_verifier.to_string(),
            created_at,
        })
    }

    /// Looks up a user by exact (case-sensitive) username.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, username, password_verifier, created_at
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Number of registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn row_to_user(row: &SqliteRow) -> Result<UserRecord, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?
        .with_timezone(&Utc);

    Ok(UserRecord {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        password_verifier: row.try_get("password_verifier")?,
        created_at,
    })
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

    #[tokio::test]
    async fn test_register_and_find() {
        let store = CredentialStore::in_memory().await.unwrap();
        let record = store.register("alice", "$argon2id$fake").await.unwrap();
        assert_eq!(record.username, "alice");

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(found.password_verifier, "$argon2id$fake");
        assert_eq!(found.created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = CredentialStore::in_memory().await.unwrap();
        store.register("alice", "v1").await.unwrap();

        let err = store.register("alice", "v2").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "alice"));
        assert_eq!(store.count().await.unwrap(), 1);

        let kept = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(kept.password_verifier, "v1");
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let store = CredentialStore::in_memory().await.unwrap();
        store.register("Alice", "v").await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_none());
        assert!(store.find_by_username("Alice").await.unwrap().is_some());

        // Differently-cased names are distinct users.
        store.register("alice", "v").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_username_not_stored() {
        let store = CredentialStore::in_memory().await.unwrap();
        assert!(matches!(
            store.register("bad name", "v").await,
            Err(StoreError::InvalidUsername(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = CredentialStore::in_memory().await.unwrap();
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }
}
