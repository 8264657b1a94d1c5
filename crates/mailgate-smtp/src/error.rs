//! SMTP client errors.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while talking to a submission server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket failure; a server hanging up shows as `UnexpectedEof`.
    #[error("SMTP I/O: {0}")]
    Io(#[from] io::Error),

    /// The TLS session could not be set up.
    #[error("SMTP TLS: {0}")]
    Tls(#[from] rustls::Error),

    /// The host is not usable as a TLS server name.
    #[error("not a valid TLS server name: {0:?}")]
    InvalidServerName(String),

    /// A command was answered with a non-success reply.
    #[error("server replied {code}: {message}")]
    Reply {
        /// Three-digit reply code, e.g. 535.
        code: u16,
        /// Reply text, lines joined.
        message: String,
    },

    /// The server's reply could not be understood.
    #[error("SMTP protocol violation: {0}")]
    Protocol(String),

    /// An envelope address failed local checks and was never sent.
    #[error("bad envelope address: {0}")]
    InvalidAddress(String),

    /// The message is larger than the server's advertised SIZE.
    #[error("message is {size} bytes but the server accepts at most {limit}")]
    MessageTooLarge {
        /// Message size.
        size: usize,
        /// Advertised limit.
        limit: usize,
    },

    /// The server did not advertise a required extension.
    #[error("server does not offer {0}")]
    NotSupported(String),
}

impl Error {
    pub(crate) fn reply(code: u16, message: impl Into<String>) -> Self {
        Self::Reply {
            code,
            message: message.into(),
        }
    }

    /// The reply code, if the server rejected a command.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for 5xx replies, which retrying will not fix.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.code(), Some(500..=599))
    }
}
