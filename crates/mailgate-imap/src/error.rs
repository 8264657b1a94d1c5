//! IMAP client errors.

use thiserror::Error;

/// Failures while talking to a retrieval server.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket failure; a server hanging up shows as `UnexpectedEof`.
    #[error("IMAP I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS session could not be set up.
    #[error("IMAP TLS: {0}")]
    Tls(#[from] rustls::Error),

    /// The host is not usable as a TLS server name.
    #[error("not a valid TLS server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Tagged NO: the command failed.
    #[error("server said NO: {0}")]
    No(String),

    /// Tagged BAD: the command was not understood.
    #[error("server said BAD: {0}")]
    Bad(String),

    /// The server is closing the connection.
    #[error("server said BYE: {0}")]
    Bye(String),

    /// Server data that does not parse or does not fit the exchange.
    #[error("IMAP protocol violation: {0}")]
    Protocol(String),

    /// The request cannot be made on this connection.
    #[error("not allowed here: {0}")]
    InvalidState(String),
}

/// Result type alias for IMAP operations.
pub type Result<T> = std::result::Result<T, Error>;
