//! Errors raised while parsing or building messages.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message could not be parsed, decoded or built.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header name or value would corrupt the header block.
    #[error("header rejected: {0}")]
    InvalidHeader(String),

    /// A Content-Type value without a `type/subtype`.
    #[error("malformed content type: {0:?}")]
    InvalidContentType(String),

    /// Quoted-printable escape or RFC 2047 word that does not decode.
    #[error("bad transfer encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 body or encoded word that does not decode.
    #[error("bad base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not valid in the declared charset.
    #[error("text is not valid in its charset: {0}")]
    Charset(#[from] FromUtf8Error),

    /// A multipart content type without its boundary parameter.
    #[error("multipart body has no boundary parameter")]
    MissingBoundary,

    /// A multipart body with no delimited parts, or nested too deeply.
    #[error("malformed multipart body: {0}")]
    InvalidMultipart(String),

    /// [`MessageBuilder::build`](crate::MessageBuilder::build) needs this
    /// header.
    #[error("cannot build a message without a {0} header")]
    MissingHeader(&'static str),
}
