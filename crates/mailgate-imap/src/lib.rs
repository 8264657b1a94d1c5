//! # mailgate-imap
//!
//! Async IMAP4rev1 client covering what the mailgate relay needs to read a
//! mailbox: greeting, STARTTLS, LOGIN, SELECT, SEARCH ALL and
//! FETCH of full messages.
//!
//! The client is generic over any `AsyncRead + AsyncWrite` stream and
//! tracks the protocol state in its type:
//!
//! ```no_run
//! use mailgate_imap::{Client, connect_tls};
//!
//! # async fn example() -> mailgate_imap::Result<()> {
//! let stream = connect_tls("imap.example.com", 993).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.login("relay@example.com", "app-password").await?;
//! let (mut inbox, status) = client.select("INBOX").await?;
//!
//! let ids = inbox.search_all().await?;
//! for seq in ids.iter().rev().take(5) {
//!     if let Some(raw) = inbox.fetch_rfc822(*seq).await? {
//!         println!("message {seq}: {} bytes", raw.len());
//!     }
//! }
//! println!("{} messages in {}", status.exists, status.name);
//! inbox.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute};
pub use connection::{
    Authenticated, Client, FramedStream, ImapStream, NotAuthenticated, Selected, connect_plain,
    connect_tls,
};
pub use error::{Error, Result};
pub use types::{Capability, MailboxStatus, ResponseCode, SequenceSet, Status};
