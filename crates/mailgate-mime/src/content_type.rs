//! Content-Type header values.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Characters that force a parameter value to be quoted (RFC 2045 tspecials).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// A parsed `type/subtype; key=value` content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type, lowercased (e.g. "text", "multipart").
    pub main_type: String,
    /// Subtype, lowercased (e.g. "plain", "mixed").
    pub sub_type: String,
    /// Parameters keyed by lowercased name.
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// `multipart/mixed` with the given boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is exactly `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.main_type == "text" && self.sub_type == "plain"
    }

    /// Parses a content type string.
    ///
    /// Type names and parameter names are lowercased. Quoted parameter
    /// values may contain `;`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `type/subtype` part is missing or empty.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();

        let essence = segments.next().unwrap_or_default();
        let (main_type, sub_type) = essence
            .split_once('/')
            .map(|(m, s)| (m.trim().to_ascii_lowercase(), s.trim().to_ascii_lowercase()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(s.to_string()))?;

        let mut content_type = Self::new(main_type, sub_type);
        for segment in segments {
            if let Some((key, value)) = segment.split_once('=') {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                content_type
                    .parameters
                    .insert(key.trim().to_ascii_lowercase(), value.to_string());
            }
        }

        Ok(content_type)
    }
}

/// Splits on `;` outside double quotes.
fn split_parameters(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(s[start..].trim());
    segments
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (key, value) in &self.parameters {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
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
    fn test_parse_lowercases() {
        let ct = ContentType::parse("Text/PLAIN; Charset=UTF-8").unwrap();
        assert!(ct.is_text_plain());
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_parse_quoted_boundary_with_semicolon() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"a;b=c\"; x=1").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("a;b=c"));
        assert_eq!(ct.parameters.get("x").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_parse_rejects_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("").is_err());
    }

    #[test]
    fn test_display_quotes_specials() {
        let ct = ContentType::multipart_mixed("==mg_abc==");
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"==mg_abc==\"");

        assert_eq!(
            ContentType::text_plain().to_string(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_display_then_parse() {
        let ct = ContentType::octet_stream().with_parameter("name", "q1 report.pdf");
        let reparsed = ContentType::parse(&ct.to_string()).unwrap();
        assert_eq!(reparsed, ct);
    }
}
