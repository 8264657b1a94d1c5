//! Gateway Facade: the single entry point for front ends.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::Authenticator;
use crate::config::GatewayConfig;
use crate::credentials::{CredentialStore, PasswordVerifier, UserRecord};
use crate::error::{GatewayError, Result};
use crate::retrieval::{self, FetchResults};
use crate::transport::{self, OutgoingMessage, SendReport};

/// Proof of a successful [`Gateway::login`].
///
/// Only `login` constructs one, so mail operations cannot run without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
}

impl Session {
    pub(crate) const fn new(username: String) -> Self {
        Self { username }
    }

    /// The authenticated username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Registration, login, sending and fetching behind one handle.
///
/// Cloning is cheap; clones share the configuration and the store's
/// connection pool.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    store: CredentialStore,
    auth: Authenticator,
}

impl Gateway {
    /// Opens the credential store at `config.database_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn open(config: GatewayConfig) -> Result<Self> {
        let path = config.database_path.to_string_lossy().into_owned();
        let store = CredentialStore::new(&path).await?;
        Ok(Self::with_store(config, store))
    }

    /// Builds a gateway over an existing store.
    #[must_use]
    pub fn with_store(config: GatewayConfig, store: CredentialStore) -> Self {
        Self {
            config: Arc::new(config),
            auth: Authenticator::new(store.clone()),
            store,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Creates a user. The verifier is derived on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyExists`] if the username is taken, or
    /// [`GatewayError::Store`] for invalid input and database failures.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord> {
        let verifier = PasswordVerifier::spawn_hash(password).await?;
        Ok(self.store.register(username, &verifier).await?)
    }

    /// Checks credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthFailure`] for an unknown username or a
    /// wrong password.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        if !self.auth.authenticate(username, password).await? {
            return Err(GatewayError::AuthFailure);
        }
        info!(username, "login accepted");
        Ok(Session::new(username.to_string()))
    }

    /// Sends a message from the service account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the message was not sent.
    pub async fn send(&self, session: &Session, message: OutgoingMessage) -> Result<SendReport> {
        debug!(user = session.username(), to = %message.recipient, "send requested");
        Ok(transport::send(&self.config, message).await?)
    }

    /// Fetches the last `count` inbox messages of the service account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Retrieval`] if the mailbox could not be read.
    pub async fn fetch_recent(&self, session: &Session, count: NonZeroUsize) -> Result<FetchResults> {
        debug!(user = session.username(), count = count.get(), "fetch requested");
        Ok(retrieval::fetch_recent(&self.config, count).await?)
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
    use crate::credentials::StoreError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    async fn gateway() -> Gateway {
        let store = CredentialStore::in_memory().await.unwrap();
        Gateway::with_store(GatewayConfig::default(), store)
    }

    fn assert_send_sync<T: Send + Sync + Clone>() {}

    #[test]
    fn test_gateway_is_shareable() {
        assert_send_sync::<Gateway>();
        assert_send_sync::<Session>();
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let gateway = gateway().await;
        let record = gateway.register("alice", "s3cret").await.unwrap();
        assert_eq!(record.username, "alice");
        assert_ne!(record.password_verifier, "s3cret");

        let session = gateway.login("alice", "s3cret").await.unwrap();
        assert_eq!(session.username(), "alice");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let gateway = gateway().await;
        gateway.register("alice", "s3cret").await.unwrap();

        for (user, pass) in [("alice", "wrong"), ("bob", "s3cret"), ("ALICE", "s3cret")] {
            let err = gateway.login(user, pass).await.unwrap_err();
            assert!(matches!(err, GatewayError::AuthFailure), "{user}/{pass}");
        }
    }

    #[tokio::test]
    async fn test_register_rejects_empty_password() {
        let gateway = gateway().await;
        let err = gateway.register("alice", "").await.unwrap_err();
        assert!(matches!(err, GatewayError::Store(StoreError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let gateway = gateway().await;
        let clone = gateway.clone();
        clone.register("alice", "s3cret").await.unwrap();
        assert!(gateway.login("alice", "s3cret").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_register_keeps_runtime_responsive() {
        let gateway = gateway().await;
        let running = Arc::new(AtomicBool::new(true));

        let ticker = tokio::spawn({
            let running = Arc::clone(&running);
            async move {
                let mut widest = Duration::ZERO;
                let mut last = Instant::now();
                while running.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    let now = Instant::now();
                    widest = widest.max(now - last);
                    last = now;
                }
                widest
            }
        });

        let registrations = tokio::spawn(async move {
            for name in ["alice", "bob", "carol"] {
                gateway.register(name, "s3cret").await.unwrap();
            }
            gateway
        });
        let gateway = registrations.await.unwrap();
        running.store(false, Ordering::SeqCst);

        let widest = ticker.await.unwrap();
        assert!(widest < Duration::from_millis(250), "ticker stalled for {widest:?}");
        assert!(gateway.login("carol", "s3cret").await.is_ok());
    }
}
