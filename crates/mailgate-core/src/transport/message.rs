//! Outgoing message types.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Supplies attachment bytes when a message is sent.
///
/// Reading happens inside the send path on a blocking thread, so a source
/// may do file or other blocking I/O. A read failure drops the attachment
/// but not the message.
pub trait AttachmentSource: Send + Sync + fmt::Debug {
    /// Reads the full attachment content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read.
    fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

impl AttachmentSource for Vec<u8> {
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.clone())
    }
}

impl AttachmentSource for &'static [u8] {
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.to_vec())
    }
}

/// A named attachment whose bytes are read at send time.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// Where the bytes come from.
    pub source: Arc<dyn AttachmentSource>,
}

impl Attachment {
    /// Creates an attachment from any source.
    pub fn new(filename: impl Into<String>, source: impl AttachmentSource + 'static) -> Self {
        Self {
            filename: filename.into(),
            source: Arc::new(source),
        }
    }

    /// Creates an attachment from bytes already in memory.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(filename, data)
    }
}

/// A message to submit. Built per call, never stored.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Single recipient address.
    pub recipient: String,
    /// Subject line; encoded as needed.
    pub subject: String,
    /// Plain-text body.
    pub body_text: String,
    /// At most one attachment.
    pub attachment: Option<Attachment>,
}

impl OutgoingMessage {
    /// Creates a message without an attachment.
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body_text: body_text.into(),
            attachment: None,
        }
    }

    /// Sets the attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Why an attachment was left out of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attachment {filename:?} was not sent: {reason}")]
pub struct AttachmentError {
    /// Filename as given by the caller.
    pub filename: String,
    /// Read or encoding failure.
    pub reason: String,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct SendReport {
    /// Set when the message went out without its attachment.
    pub attachment_error: Option<AttachmentError>,
}

impl SendReport {
    /// True if everything requested was sent.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.attachment_error.is_none()
    }
}
