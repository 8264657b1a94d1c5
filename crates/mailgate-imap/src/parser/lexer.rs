//! Byte cursor over one framed response.

use crate::{Error, Result};

/// Nesting limit for parenthesized lists.
const MAX_NESTING: usize = 32;

/// Cursor over a response, literals included.
#[derive(Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub fn error(&self, message: &str) -> Error {
        Error::Protocol(format!("{message} at byte {}", self.pos))
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\r' | b'\n'))
    }

    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", char::from(byte))))
        }
    }

    pub fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }

    /// Reads bytes up to a delimiter: space, parens, brackets or line end.
    pub fn atom(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'(' | b')' | b'[' | b']' | b'\r' | b'\n') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected atom"));
        }
        std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.error("non-UTF-8 atom"))
    }

    pub fn number(&mut self) -> Result<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("expected number"))
    }

    /// Reads up to (not including) `end`, returning the raw bytes.
    pub fn until(&mut self, end: u8) -> Result<&'a [u8]> {
        let start = self.pos;
        let offset = self.input[start..]
            .iter()
            .position(|&b| b == end)
            .ok_or_else(|| self.error(&format!("missing '{}'", char::from(end))))?;
        self.pos += offset;
        Ok(&self.input[start..self.pos])
    }

    /// Remaining text on the current line.
    pub fn rest_of_line(&mut self) -> String {
        let start = self.pos;
        while !self.at_line_end() {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Reads a quoted string or literal.
    pub fn string(&mut self) -> Result<Vec<u8>> {
        match self.peek() {
            Some(b'"') => self.quoted(),
            Some(b'{') => self.literal(),
            _ => Err(self.error("expected string")),
        }
    }

    /// Reads NIL, a quoted string or a literal.
    pub fn nstring(&mut self) -> Result<Option<Vec<u8>>> {
        if self.input[self.pos..].len() >= 3 && self.input[self.pos..self.pos + 3].eq_ignore_ascii_case(b"NIL") {
            self.pos += 3;
            return Ok(None);
        }
        self.string().map(Some)
    }

    fn quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\r' | b'\n') => return Err(self.error("unterminated quoted string")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn literal(&mut self) -> Result<Vec<u8>> {
        self.expect(b'{')?;
        let len = usize::try_from(self.number()?).map_err(|_| self.error("literal too large"))?;
        self.eat(b'+');
        self.expect(b'}')?;
        self.expect(b'\r')?;
        self.expect(b'\n')?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("truncated literal"))?;
        let data = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(data)
    }

    /// Skips one value of any shape.
    pub fn skip_value(&mut self) -> Result<()> {
        self.skip_value_at(0)
    }

    fn skip_value_at(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                loop {
                    self.skip_spaces();
                    if self.eat(b')') {
                        return Ok(());
                    }
                    if self.at_line_end() {
                        return Err(self.error("unterminated list"));
                    }
                    self.skip_value_at(depth + 1)?;
                }
            }
            Some(b'"' | b'{') => self.string().map(|_| ()),
            _ => {
                self.atom()?;
                // Section specifiers such as BODY[HEADER] stay attached.
                if self.eat(b'[') {
                    self.until(b']')?;
                    self.expect(b']')?;
                }
                Ok(())
            }
        }
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
    fn test_quoted_with_escapes() {
        let mut c = Cursor::new(br#""a \"b\" \\c" rest"#);
        assert_eq!(c.string().unwrap(), br#"a "b" \c"#.to_vec());
        assert_eq!(c.peek(), Some(b' '));
    }

    #[test]
    fn test_literal() {
        let mut c = Cursor::new(b"{5}\r\nhello)");
        assert_eq!(c.string().unwrap(), b"hello".to_vec());
        assert_eq!(c.peek(), Some(b')'));
    }

    #[test]
    fn test_literal_plus_and_truncation() {
        let mut c = Cursor::new(b"{3+}\r\nabc");
        assert_eq!(c.string().unwrap(), b"abc".to_vec());

        let mut c = Cursor::new(b"{10}\r\nabc");
        assert!(c.string().is_err());
    }

    #[test]
    fn test_nstring_nil() {
        let mut c = Cursor::new(b"NIL");
        assert_eq!(c.nstring().unwrap(), None);
    }

    #[test]
    fn test_skip_nested_value() {
        let mut c = Cursor::new(b"((\"a\" NIL) {2}\r\nab) BODY[HEADER] END");
        c.skip_value().unwrap();
        c.skip_spaces();
        c.skip_value().unwrap();
        c.skip_spaces();
        assert_eq!(c.atom().unwrap(), "END");
    }

    #[test]
    fn test_skip_unterminated_list() {
        let mut c = Cursor::new(b"(a b\r\n");
        assert!(c.skip_value().is_err());
    }
}
