//! Argument encoding for command lines.

use crate::{Error, Result};

/// Builds a command as a sequence of chunks.
///
/// Every chunk except the last ends with a synchronizing literal header
/// `{n}\r\n`; the sender must wait for a `+` continuation before writing
/// the next chunk, which starts with the literal's bytes.
#[derive(Debug, Default)]
pub struct CommandWriter {
    chunks: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl CommandWriter {
    /// Starts a command line with its tag.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            chunks: Vec::new(),
            current: tag.as_bytes().to_vec(),
        }
    }

    /// Appends a space and a raw token.
    pub fn token(&mut self, token: &str) -> &mut Self {
        self.current.push(b' ');
        self.current.extend_from_slice(token.as_bytes());
        self
    }

    /// Appends a space and an astring, choosing atom, quoted or literal form.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains NUL, which no form can carry.
    pub fn astring(&mut self, value: &str) -> Result<&mut Self> {
        if value.contains('\0') {
            return Err(Error::InvalidState("argument contains NUL".to_string()));
        }

        self.current.push(b' ');
        if !value.is_empty() && value.bytes().all(is_atom_char) {
            self.current.extend_from_slice(value.as_bytes());
        } else if value.bytes().all(is_quotable) {
            self.current.push(b'"');
            for b in value.bytes() {
                if b == b'"' || b == b'\\' {
                    self.current.push(b'\\');
                }
                self.current.push(b);
            }
            self.current.push(b'"');
        } else {
            self.current
                .extend_from_slice(format!("{{{}}}\r\n", value.len()).as_bytes());
            self.chunks.push(std::mem::take(&mut self.current));
            self.current.extend_from_slice(value.as_bytes());
        }
        Ok(self)
    }

    /// Terminates the line and returns the chunks.
    #[must_use]
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.current.extend_from_slice(b"\r\n");
        self.chunks.push(self.current);
        self.chunks
    }
}

/// ASTRING-CHAR without quoting.
const fn is_atom_char(b: u8) -> bool {
    b > 0x20 && b < 0x7F && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\')
}

/// Characters a quoted string can carry (7-bit, no CR or LF).
const fn is_quotable(b: u8) -> bool {
    b > 0 && b < 0x80 && b != b'\r' && b != b'\n'
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

    fn render(value: &str) -> Vec<Vec<u8>> {
        let mut writer = CommandWriter::new("A1");
        writer.astring(value).unwrap();
        writer.finish()
    }

    #[test]
    fn test_atom() {
        assert_eq!(render("INBOX"), vec![b"A1 INBOX\r\n".to_vec()]);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(render(""), vec![b"A1 \"\"\r\n".to_vec()]);
        assert_eq!(render("my pass"), vec![b"A1 \"my pass\"\r\n".to_vec()]);
        assert_eq!(render("a\"b\\c"), vec![b"A1 \"a\\\"b\\\\c\"\r\n".to_vec()]);
    }

    #[test]
    fn test_literal_for_non_ascii() {
        let chunks = render("pässword");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], b"A1 {9}\r\n".to_vec());
        assert_eq!(chunks[1], "pässword\r\n".as_bytes().to_vec());
    }

    #[test]
    fn test_nul_rejected() {
        let mut writer = CommandWriter::new("A1");
        assert!(writer.astring("a\0b").is_err());
    }
}
