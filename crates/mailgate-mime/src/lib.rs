//! # mailgate-mime
//!
//! MIME message generation and parsing for the mailgate relay.
//!
//! ## Features
//!
//! - **Message generation**: `multipart/mixed` messages with a plain-text body
//!   and base64-encoded attachments
//! - **Message parsing**: headers, nested multipart bodies flattened in walk
//!   order, transfer-encoding aware body decoding
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header words
//!
//! ## Building a message
//!
//! ```ignore
//! use mailgate_mime::{Attachment, MessageBuilder};
//!
//! let raw = MessageBuilder::new()
//!     .from("relay@example.com")
//!     .to("a@example.com")
//!     .subject("Report")
//!     .text_body("See attached.")
//!     .attach(Attachment::new("report.pdf", pdf_bytes)?)
//!     .build()?;
//! ```
//!
//! ## Parsing a message
//!
//! ```ignore
//! use mailgate_mime::Message;
//!
//! let message = Message::parse(&raw)?;
//! println!("{}", message.subject().unwrap_or_default());
//! println!("{}", message.plain_text()?.unwrap_or_default());
//! ```

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{Attachment, MessageBuilder};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
