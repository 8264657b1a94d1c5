//! Parsed MIME messages.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Maximum multipart nesting followed by the parser.
const MAX_DEPTH: usize = 16;

/// Content-Transfer-Encoding values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII, the default.
    #[default]
    SevenBit,
    /// 8-bit data.
    EightBit,
    /// Base64.
    Base64,
    /// Quoted-Printable.
    QuotedPrintable,
    /// Raw binary.
    Binary,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding value. Unknown values map to 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        })
    }
}

/// A leaf body part of a multipart message.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw (still transfer-encoded) body.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Returns the content type, `text/plain` when the header is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the Content-Type header is malformed.
    pub fn content_type(&self) -> Result<ContentType> {
        content_type_of(&self.headers)
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        transfer_encoding_of(&self.headers)
    }

    /// Undoes the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid for its encoding.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode_transfer(self.transfer_encoding(), &self.body)
    }

    /// Decodes the body to text using the part's charset.
    ///
    /// # Errors
    ///
    /// Returns an error if transfer or charset decoding fails.
    pub fn body_text(&self) -> Result<String> {
        decode_text(&self.headers, &self.body)
    }
}

/// A parsed message.
///
/// Multipart bodies are flattened: `parts` holds every non-multipart part
/// in depth-first order, however deeply the multiparts nest.
#[derive(Debug, Clone)]
pub struct Message {
    /// Top-level headers.
    pub headers: Headers,
    /// Leaf parts, empty for single-part messages.
    pub parts: Vec<Part>,
    /// Raw body following the header block.
    pub body: Vec<u8>,
}

impl Message {
    /// Parses raw RFC 5322 message bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the top-level Content-Type is malformed or a
    /// multipart body has no boundary or no parts.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head));

        let mut parts = Vec::new();
        let content_type = content_type_of(&headers)?;
        if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
            collect_parts(body, boundary, 0, &mut parts)?;
        }

        Ok(Self {
            headers,
            parts,
            body: body.to_vec(),
        })
    }

    /// Returns true if the message was multipart.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        content_type_of(&self.headers).is_ok_and(|ct| ct.is_multipart())
    }

    /// Raw From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Raw To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Raw Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Raw Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// The plain-text body of the message.
    ///
    /// For multipart messages this is the first `text/plain` part; parts
    /// with a malformed Content-Type are passed over. Returns `None` when
    /// no such part exists. A single-part body is decoded whatever its
    /// declared type.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen part fails to decode.
    pub fn plain_text(&self) -> Result<Option<String>> {
        if !self.is_multipart() {
            return decode_text(&self.headers, &self.body).map(Some);
        }

        self.parts
            .iter()
            .find(|part| part.content_type().is_ok_and(|ct| ct.is_text_plain()))
            .map(Part::body_text)
            .transpose()
    }
}

fn content_type_of(headers: &Headers) -> Result<ContentType> {
    headers
        .get("content-type")
        .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
}

fn transfer_encoding_of(headers: &Headers) -> TransferEncoding {
    headers
        .get("content-transfer-encoding")
        .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
}

fn decode_transfer(encoding: TransferEncoding, body: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(body)),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Ok(body.to_vec())
        }
    }
}

fn decode_text(headers: &Headers, body: &[u8]) -> Result<String> {
    let bytes = decode_transfer(transfer_encoding_of(headers), body)?;
    let charset = content_type_of(headers)
        .ok()
        .and_then(|ct| ct.charset().map(str::to_string))
        .unwrap_or_else(|| "utf-8".to_string());
    decode_charset(&bytes, &charset)
}

/// Splits at the first blank line. Accepts CRLF or bare LF line endings.
fn split_head_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n").map(|i| (i, i + 2));

    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((head_end, body_start)) => (&raw[..head_end], &raw[body_start..]),
        None => (raw, &[]),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn collect_parts(body: &[u8], boundary: &str, depth: usize, out: &mut Vec<Part>) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(Error::InvalidMultipart("nesting too deep".to_string()));
    }

    for section in split_multipart(body, boundary)? {
        // A leading blank line means the part has no headers.
        let (head, content) = match section
            .strip_prefix(b"\r\n")
            .or_else(|| section.strip_prefix(b"\n"))
        {
            Some(content) => (&[][..], content),
            None => split_head_body(section),
        };
        let headers = Headers::parse(&String::from_utf8_lossy(head));

        match content_type_of(&headers) {
            Ok(ct) if ct.is_multipart() => {
                let nested = ct.boundary().ok_or(Error::MissingBoundary)?;
                collect_parts(content, nested, depth + 1, out)?;
            }
            _ => out.push(Part::new(headers, content.to_vec())),
        }
    }

    Ok(())
}

/// Returns the sections between `--boundary` delimiter lines.
///
/// The preamble and epilogue are dropped, and the line break preceding a
/// delimiter belongs to the delimiter.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let mut sections = Vec::new();
    let mut current: Option<usize> = None;
    let mut closed = false;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i + 1);
        let line = body[pos..line_end].trim_ascii_end();

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let is_close = rest == b"--";
            if rest.is_empty() || is_close {
                if let Some(start) = current.take() {
                    sections.push(strip_line_break(&body[start..pos]));
                }
                if is_close {
                    closed = true;
                    break;
                }
                current = Some(line_end);
            }
        }

        pos = line_end;
    }

    if !closed {
        if let Some(start) = current {
            sections.push(&body[start..]);
        }
    }

    if sections.is_empty() {
        return Err(Error::InvalidMultipart(format!(
            "no parts delimited by {delimiter}"
        )));
    }

    Ok(sections)
}

fn strip_line_break(section: &[u8]) -> &[u8] {
    section
        .strip_suffix(b"\r\n")
        .or_else(|| section.strip_suffix(b"\n"))
        .unwrap_or(section)
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
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-unknown"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_parse_single_part() {
        let raw = b"From: a@example.com\r\nSubject: Hi\r\n\r\nHello there\r\n";
        let message = Message::parse(raw).unwrap();

        assert!(!message.is_multipart());
        assert_eq!(message.from(), Some("a@example.com"));
        assert_eq!(message.subject(), Some("Hi"));
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("Hello there\r\n"));
    }

    #[test]
    fn test_parse_lf_only() {
        let raw = b"Subject: Unix\n\nbody\n";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject(), Some("Unix"));
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("body\n"));
    }

    #[test]
    fn test_parse_headers_only() {
        let message = Message::parse(b"Subject: empty").unwrap();
        assert_eq!(message.subject(), Some("empty"));
        assert!(message.body.is_empty());
    }

    #[test]
    fn test_multipart_first_plain_part() {
        let raw = concat!(
            "From: a@example.com\r\n",
            "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
            "\r\n",
            "preamble\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html</p>\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=C3=A9\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "second\r\n",
            "--XYZ--\r\n",
            "epilogue\r\n"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("café"));
    }

    #[test]
    fn test_nested_multipart_flattened() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "bmVzdGVk\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<b>nested</b>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/octet-stream\r\n",
            "\r\n",
            "AAAA\r\n",
            "--outer--\r\n"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        let types: Vec<String> = message
            .parts
            .iter()
            .map(|p| {
                let ct = p.content_type().unwrap();
                format!("{}/{}", ct.main_type, ct.sub_type)
            })
            .collect();
        assert_eq!(types, ["text/plain", "text/html", "application/octet-stream"]);
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("nested"));
    }

    #[test]
    fn test_multipart_without_plain_part() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>only html</p>\r\n",
            "--b--\r\n"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.plain_text().unwrap(), None);
    }

    #[test]
    fn test_multipart_skips_malformed_part_type() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: garbage\r\n",
            "\r\n",
            "ignored\r\n",
            "--b\r\n",
            "\r\n",
            "defaults to plain\r\n",
            "--b--\r\n"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(
            message.plain_text().unwrap().as_deref(),
            Some("defaults to plain")
        );
    }

    #[test]
    fn test_multipart_missing_boundary() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nbody\r\n";
        assert!(matches!(Message::parse(raw), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_multipart_unclosed_keeps_last_part() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "truncated"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("truncated"));
    }

    #[test]
    fn test_latin1_charset() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xe9";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.plain_text().unwrap().as_deref(), Some("café"));
    }

    #[test]
    fn test_invalid_utf8_body_is_error() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\r\n\xff\xfe";
        let message = Message::parse(raw).unwrap();
        assert!(message.plain_text().is_err());
    }
}
