//! # mailgate-core
//!
//! Account management and mail relay for mailgate.
//!
//! Users register and log in against a local credential store. A logged-in
//! [`Session`] can then send mail through, and read the inbox of, a single
//! service account configured in [`GatewayConfig`].
//!
//! ## Components
//!
//! - [`credentials`]: SQLite user records with Argon2 password verifiers
//! - [`auth`]: login checks against the store
//! - [`transport`]: SMTP submission with an optional attachment
//! - [`retrieval`]: IMAP fetch of the most recent inbox messages
//! - [`Gateway`]: the facade tying them together
//!
//! ## Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use mailgate_core::{Gateway, GatewayConfig, OutgoingMessage};
//!
//! # async fn example() -> mailgate_core::Result<()> {
//! let gateway = Gateway::open(GatewayConfig::from_env()?).await?;
//! gateway.register("alice", "correct horse").await?;
//! let session = gateway.login("alice", "correct horse").await?;
//!
//! let message = OutgoingMessage::new("bob@example.com", "Hi", "Hello");
//! let report = gateway.send(&session, message).await?;
//! assert!(report.is_complete());
//!
//! for summary in gateway.fetch_recent(&session, NonZeroUsize::MIN).await? {
//!     match summary {
//!         Ok(m) => println!("{}: {}", m.from, m.subject),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod credentials;
mod deadline;
mod error;
mod gateway;
pub mod retrieval;
pub mod transport;

pub use auth::Authenticator;
pub use config::{ConfigError, Endpoint, GatewayConfig, Secret, Security};
pub use credentials::{CredentialStore, StoreError, UserId, UserRecord};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, Session};
pub use retrieval::{DecodeError, FetchResults, InboundMessageSummary, RetrievalError};
pub use transport::{
    Attachment, AttachmentError, AttachmentSource, OutgoingMessage, SendReport, TransportError,
};
