//! # mailgate-smtp
//!
//! Async SMTP submission client used by the mailgate relay.
//!
//! ## Features
//!
//! - **Type-state client**: the compiler enforces greeting, EHLO, AUTH,
//!   MAIL FROM, RCPT TO and DATA ordering
//! - **TLS**: implicit TLS (port 465) and STARTTLS (port 587) via rustls
//! - **Authentication**: AUTH PLAIN and AUTH LOGIN
//! - **DATA encoding**: CRLF normalization and dot-stuffing
//!
//! ## Example
//!
//! ```ignore
//! use mailgate_smtp::{Address, Client, connection::connect};
//!
//! let stream = connect("smtp.example.com", 587).await?;
//! let client = Client::from_stream(stream)
//!     .await?
//!     .ehlo("relay.local")
//!     .await?
//!     .starttls("smtp.example.com", "relay.local")
//!     .await?;
//!
//! let mechanism = client.server_info().preferred_auth();
//! let client = client.authenticate(mechanism, "relay@example.com", secret).await?;
//! let client = client
//!     .mail_from(Address::new("relay@example.com")?, Some(raw.len()))
//!     .await?
//!     .rcpt_to(Address::new("alice@example.com")?)
//!     .await?
//!     .data()
//!     .await?
//!     .send_message(&raw)
//!     .await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                       ↑                               │
//!                                       │                          rcpt_to()
//!                                 send_message()                        ↓
//!                                       └──────── Data ←── data() ── RecipientAdded
//! ```

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
