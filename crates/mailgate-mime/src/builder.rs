//! Outgoing message generation.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::TransferEncoding;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// SMTP line limit excluding CRLF (RFC 5322 section 2.1.1).
const MAX_LINE_LENGTH: usize = 998;

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the filename is empty or contains a quote,
    /// backslash, line break or NUL.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(Error::InvalidHeader("attachment filename is empty".to_string()));
        }
        if filename.contains(['"', '\\', '\r', '\n', '\0']) {
            return Err(Error::InvalidHeader(format!(
                "attachment filename {filename:?} contains a forbidden character"
            )));
        }
        Ok(Self { filename, data })
    }

    /// The attachment's filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The attachment's content.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn disposition(&self) -> String {
        if self.filename.is_ascii() {
            format!("attachment; filename=\"{}\"", self.filename)
        } else {
            format!(
                "attachment; filename*=utf-8''{}",
                percent_encode(&self.filename)
            )
        }
    }
}

/// RFC 2231 extended parameter value encoding.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Builds `multipart/mixed` messages with a plain-text body and optional
/// attachments.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: String,
    text: String,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
    date: Option<String>,
    message_id: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From address.
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the To address.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Sets the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Adds an attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Overrides the generated multipart boundary.
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Overrides the Date header, which defaults to the current time.
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Overrides the generated Message-ID.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Serializes the message with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if From or To is missing, or if any header value
    /// contains a line break.
    pub fn build(self) -> Result<Vec<u8>> {
        let from = self.from.ok_or(Error::MissingHeader("From"))?;
        let to = self.to.ok_or(Error::MissingHeader("To"))?;

        if self.subject.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader("Subject contains a line break".to_string()));
        }

        let boundary = self.boundary.unwrap_or_else(generate_boundary);
        let message_id = self
            .message_id
            .unwrap_or_else(|| generate_message_id(&from));
        let date = self
            .date
            .unwrap_or_else(|| chrono::Utc::now().to_rfc2822());

        let mut headers = Headers::new();
        headers.add_checked("From", &from)?;
        headers.add_checked("To", &to)?;
        headers.add_checked("Subject", &encode_rfc2047(&self.subject))?;
        headers.add_checked("Date", &date)?;
        headers.add_checked("Message-ID", &message_id)?;
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );

        let mut out = headers.to_string();
        out.push_str("\r\n");

        let (encoding, body) = encode_text_body(&self.text);
        out.push_str(&format!(
            "--{boundary}\r\nContent-Type: {}\r\nContent-Transfer-Encoding: {encoding}\r\n\r\n{body}\r\n",
            ContentType::text_plain()
        ));

        for attachment in &self.attachments {
            out.push_str(&format!(
                "--{boundary}\r\nContent-Type: {}\r\nContent-Transfer-Encoding: {}\r\nContent-Disposition: {}\r\n\r\n{}",
                ContentType::octet_stream(),
                TransferEncoding::Base64,
                attachment.disposition(),
                encode_base64_wrapped(&attachment.data)
            ));
        }

        out.push_str(&format!("--{boundary}--\r\n"));
        Ok(out.into_bytes())
    }
}

/// Picks 7bit for short-lined ASCII text, base64 otherwise.
///
/// The returned 7bit text has CRLF line endings and no trailing CRLF.
fn encode_text_body(text: &str) -> (TransferEncoding, String) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let seven_bit = normalized.is_ascii()
        && !normalized.contains('\0')
        && normalized.lines().all(|line| line.len() <= MAX_LINE_LENGTH);

    if seven_bit {
        (TransferEncoding::SevenBit, normalized.replace('\n', "\r\n"))
    } else {
        let mut encoded = encode_base64_wrapped(text.as_bytes());
        encoded.truncate(encoded.trim_end().len());
        (TransferEncoding::Base64, encoded)
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_boundary() -> String {
    format!("=_mailgate_{}", random_token(24))
}

fn generate_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>'))
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!(
        "<{}.{}@{domain}>",
        chrono::Utc::now().timestamp_millis(),
        random_token(16)
    )
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
    use crate::message::Message;

    fn base() -> MessageBuilder {
        MessageBuilder::new()
            .from("relay@example.com")
            .to("alice@example.com")
            .subject("Weekly report")
            .date("Sat, 17 Oct 2026 09:00:00 +0000")
            .boundary("BOUNDARY")
    }

    #[test]
    fn test_attachment_rejects_bad_filenames() {
        assert!(Attachment::new("", vec![]).is_err());
        assert!(Attachment::new("   ", vec![]).is_err());
        assert!(Attachment::new("a\"b.txt", vec![]).is_err());
        assert!(Attachment::new("evil\r\nBcc: x.txt", vec![]).is_err());
        assert!(Attachment::new("report.pdf", vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn test_build_requires_addresses() {
        let err = MessageBuilder::new().to("a@example.com").build().unwrap_err();
        assert!(matches!(err, Error::MissingHeader(h) if h == "From"));

        let err = MessageBuilder::new().from("a@example.com").build().unwrap_err();
        assert!(matches!(err, Error::MissingHeader(h) if h == "To"));
    }

    #[test]
    fn test_build_rejects_header_injection() {
        assert!(base().subject("Hi\r\nBcc: x@example.com").build().is_err());
        assert!(base().to("a@example.com\r\nBcc: x@example.com").build().is_err());
    }

    #[test]
    fn test_build_body_only_layout() {
        let raw = base().text_body("line one\nline two").build().unwrap();
        let text = String::from_utf8(raw).unwrap();

        assert!(text.starts_with("From: relay@example.com\r\nTo: alice@example.com\r\n"));
        assert!(text.contains("Subject: Weekly report\r\n"));
        assert!(text.contains("MIME-Version: 1.0\r\n"));
        assert!(text.contains("Content-Type: multipart/mixed; boundary=BOUNDARY\r\n"));
        assert!(text.contains("Message-ID: <"));
        assert!(text.contains("\r\n\r\nline one\r\nline two\r\n--BOUNDARY--\r\n"));
        assert!(!text.contains("Content-Disposition"));
    }

    #[test]
    fn test_build_with_attachment() {
        let attachment = Attachment::new("report.pdf", b"%PDF-1.4 data".to_vec()).unwrap();
        let raw = base().text_body("See attached.").attach(attachment).build().unwrap();
        let text = String::from_utf8(raw.clone()).unwrap();

        assert!(text.contains("Content-Type: application/octet-stream\r\n"));
        assert!(text.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(text.contains("Content-Disposition: attachment; filename=\"report.pdf\"\r\n"));

        let parsed = Message::parse(&raw).unwrap();
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.parts[1].decode_body().unwrap(), b"%PDF-1.4 data");
        assert_eq!(parsed.plain_text().unwrap().as_deref(), Some("See attached."));
    }

    #[test]
    fn test_non_ascii_subject_and_body() {
        let raw = base()
            .subject("Résumé")
            .text_body("Grüße aus Köln")
            .build()
            .unwrap();

        let parsed = Message::parse(&raw).unwrap();
        assert_eq!(
            parsed.headers.get_decoded("subject").as_deref(),
            Some("Résumé")
        );
        assert_eq!(parsed.parts[0].transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(
            parsed.plain_text().unwrap().as_deref(),
            Some("Grüße aus Köln")
        );
    }

    #[test]
    fn test_non_ascii_filename_uses_rfc2231() {
        let attachment = Attachment::new("Übersicht.txt", b"x".to_vec()).unwrap();
        let raw = base().attach(attachment).build().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("filename*=utf-8''%C3%9Cbersicht.txt"));
    }

    #[test]
    fn test_percent_encode_keeps_attr_chars() {
        assert_eq!(percent_encode("a b.txt"), "a%20b.txt");
        assert_eq!(percent_encode("x~y_z-1!"), "x~y_z-1!");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_attachment_part_layout() {
        let attachment = Attachment::new("a.bin", vec![0xff, 0x00]).unwrap();
        let raw = base().text_body("hi").attach(attachment).build().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains(concat!(
            "--BOUNDARY\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-Disposition: attachment; filename=\"a.bin\"\r\n",
            "\r\n",
            "/wA=\r\n",
            "--BOUNDARY--\r\n"
        )));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = MessageBuilder::new().from("x@example.com").to("y@example.com");
        let first = String::from_utf8(a.clone().build().unwrap()).unwrap();
        let second = String::from_utf8(a.build().unwrap()).unwrap();

        let id = |s: &str| {
            s.lines()
                .find(|l| l.starts_with("Message-ID:"))
                .unwrap()
                .to_string()
        };
        assert_ne!(id(&first), id(&second));
        assert!(id(&first).ends_with("@example.com>"));
    }
}
