//! Decoding fetched messages into summaries.

use mailgate_mime::Message;
use serde::Serialize;
use thiserror::Error;

/// Sender, subject and plain-text body of one fetched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessageSummary {
    /// Server sequence number the message was fetched from.
    pub seq: u32,
    /// Decoded From header; empty if absent.
    pub from: String,
    /// Decoded Subject header; empty if absent.
    pub subject: String,
    /// First `text/plain` part; empty if there is none.
    pub body_text: String,
}

/// A message that could not be decoded. Its neighbours are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message {seq} could not be decoded: {reason}")]
pub struct DecodeError {
    /// Server sequence number of the message.
    pub seq: u32,
    /// What went wrong.
    pub reason: String,
}

impl DecodeError {
    pub(crate) fn new(seq: u32, reason: impl Into<String>) -> Self {
        Self {
            seq,
            reason: reason.into(),
        }
    }
}

/// Parses a raw RFC 822 message.
pub(crate) fn summarize(seq: u32, raw: &[u8]) -> Result<InboundMessageSummary, DecodeError> {
    let message = Message::parse(raw).map_err(|e| DecodeError::new(seq, e.to_string()))?;
    let body_text = message
        .plain_text()
        .map_err(|e| DecodeError::new(seq, e.to_string()))?
        .unwrap_or_default();

    Ok(InboundMessageSummary {
        seq,
        from: message.headers.get_decoded("From").unwrap_or_default(),
        subject: message.headers.get_decoded("Subject").unwrap_or_default(),
        body_text,
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

    #[test]
    fn test_single_part() {
        let raw = b"From: Alice <alice@example.com>\r\nSubject: Hello\r\n\r\nJust text.";
        let summary = summarize(1, raw).unwrap();
        assert_eq!(summary.from, "Alice <alice@example.com>");
        assert_eq!(summary.subject, "Hello");
        assert_eq!(summary.body_text, "Just text.");
    }

    #[test]
    fn test_encoded_headers_and_quoted_printable() {
        let raw = concat!(
            "From: =?utf-8?Q?Ren=C3=A9?= <rene@example.com>\r\n",
            "Subject: =?utf-8?B?Q2Fmw6k=?=\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Caf=C3=A9 at n=\r\noon",
        );
        let summary = summarize(4, raw.as_bytes()).unwrap();
        assert_eq!(summary.from, "René <rene@example.com>");
        assert_eq!(summary.subject, "Café");
        assert_eq!(summary.body_text, "Café at noon");
    }

    #[test]
    fn test_nested_multipart_first_plain_part() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html</p>\r\n",
            "--inner\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "bmVzdGVkIHBsYWlu\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "second plain\r\n",
            "--outer--\r\n",
        );
        let summary = summarize(2, raw.as_bytes()).unwrap();
        assert_eq!(summary.body_text, "nested plain");
        assert_eq!(summary.subject, "");
    }

    #[test]
    fn test_multipart_without_plain_part() {
        let raw = concat!(
            "Subject: pictures\r\n",
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "xyz\r\n",
            "--b--\r\n",
        );
        let summary = summarize(3, raw.as_bytes()).unwrap();
        assert_eq!(summary.body_text, "");
        assert_eq!(summary.from, "");
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let raw = concat!(
            "Subject: broken\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "!!!not base64!!!\r\n",
        );
        let err = summarize(7, raw.as_bytes()).unwrap_err();
        assert_eq!(err.seq, 7);
        assert!(err.to_string().starts_with("message 7 could not be decoded"));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let raw = b"Subject: bytes\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n\xff\xfe";
        assert!(summarize(1, raw).is_err());
    }
}
