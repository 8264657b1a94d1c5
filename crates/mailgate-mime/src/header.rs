//! MIME header handling.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names are matched case-insensitively but written back with the casing
/// they were added with, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Adds a header value after checking it cannot break the header block.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains a colon or
    /// whitespace, or if the value contains CR, LF or NUL.
    pub fn add_checked(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || name.contains(|c: char| c == ':' || c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidHeader(format!("bad header name: {name:?}")));
        }
        if value.contains(['\r', '\n', '\0']) {
            return Err(Error::InvalidHeader(format!(
                "{name} value contains a line break"
            )));
        }
        self.add(name, value);
        Ok(())
    }

    /// Sets a header value, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the first value for a header with RFC 2047 words decoded.
    ///
    /// Values whose encoded words fail to decode are returned raw.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|raw| decode_rfc2047(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a header block.
    ///
    /// Parsing stops at the first empty line. Folded continuation lines
    /// (starting with space or tab) are unfolded into the previous header.
    /// Lines without a colon are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
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
    fn test_headers_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set_replaces() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("to", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
    }

    #[test]
    fn test_headers_add_checked_rejects_injection() {
        let mut headers = Headers::new();
        assert!(headers.add_checked("Subject", "Hi\r\nBcc: x@example.com").is_err());
        assert!(headers.add_checked("Bad Name", "value").is_err());
        assert!(headers.add_checked("Subject", "Hi").is_ok());
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_parse_folded() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: multipart/mixed;\r\n",
            "\tboundary=\"abc\"\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("multipart/mixed; boundary=\"abc\"")
        );
        assert!(headers.get("Body").is_none());
    }

    #[test]
    fn test_headers_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?=");
        headers.add("X-Broken", "=?utf-8?B?***?=");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Héllo"));
        assert_eq!(
            headers.get_decoded("x-broken").as_deref(),
            Some("=?utf-8?B?***?=")
        );
    }

    #[test]
    fn test_headers_display_preserves_order() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com");
        headers.add("From", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\r\nFrom: sender@example.com\r\n"
        );
    }

    proptest::proptest! {
        #[test]
        fn parse_never_panics(text in "\\PC*") {
            let _ = Headers::parse(&text);
        }

        #[test]
        fn parsed_values_have_no_line_breaks(text in "[a-zA-Z: \t\r\n-]{0,200}") {
            let headers = Headers::parse(&text);
            for (_, value) in headers.iter() {
                proptest::prop_assert!(!value.contains('\n'));
            }
        }
    }
}
