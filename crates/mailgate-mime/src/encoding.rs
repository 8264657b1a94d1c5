//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded words.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Line length for base64 bodies (RFC 2045 limits lines to 76 characters).
const BASE64_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of 76 characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2 + 2);

    // Base64 output is ASCII, so byte chunks are valid char boundaries.
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        wrapped.push_str(&String::from_utf8_lossy(chunk));
        wrapped.push_str("\r\n");
    }

    wrapped
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045) into raw bytes.
///
/// Charset interpretation is left to the caller.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break: "=\r\n" or "=\n"
        match data.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let hex = data
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Invalid hex escape".to_string()))?;
        let value = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(value);
        i += 3;
    }

    Ok(result)
}

/// Encodes a header value using RFC 2047 Base64 encoded words when needed.
///
/// ASCII text without `=?` sequences is returned unchanged.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.is_ascii() && !text.contains("=?") {
        return text.to_string();
    }

    format!("=?utf-8?B?{}?=", encode_base64(text.as_bytes()))
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format of a word: `=?charset?encoding?encoded-text?=`. Whitespace between
/// two adjacent encoded words is dropped, as the RFC requires. Text outside
/// encoded words is kept as-is.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed or does not decode.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        let Some((word, consumed)) = split_encoded_word(candidate) else {
            output.push_str(before);
            output.push_str("=?");
            rest = &candidate[2..];
            last_was_word = false;
            continue;
        };

        if !(last_was_word && before.trim().is_empty()) {
            output.push_str(before);
        }
        output.push_str(&decode_encoded_word(word)?);
        rest = &candidate[consumed..];
        last_was_word = true;
    }

    output.push_str(rest);
    Ok(output)
}

/// Splits a leading `=?charset?enc?text?=` word off `input`.
///
/// Returns the inner `charset?enc?text` and the number of bytes consumed.
fn split_encoded_word(input: &str) -> Option<(&str, usize)> {
    let inner = input.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let after_charset = &inner[charset_end + 1..];
    let encoding_end = after_charset.find('?')?;
    let after_encoding = &after_charset[encoding_end + 1..];
    let text_end = after_encoding.find("?=")?;

    let inner_len = charset_end + 1 + encoding_end + 1 + text_end;
    Some((&inner[..inner_len], 2 + inner_len + 2))
}

fn decode_encoded_word(word: &str) -> Result<String> {
    let mut parts = word.splitn(3, '?');
    let charset = parts.next().unwrap_or_default();
    let encoding = parts.next().unwrap_or_default().to_ascii_uppercase();
    let encoded_text = parts.next().unwrap_or_default();

    let bytes = match encoding.as_str() {
        "B" => decode_base64(encoded_text)?,
        "Q" => decode_quoted_printable(encoded_text.replace('_', " ").as_bytes())?,
        _ => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoding: {encoding}"
            )));
        }
    };

    decode_charset(&bytes, charset)
}

/// Decodes bytes in the given charset.
///
/// UTF-8 and US-ASCII are decoded strictly; ISO-8859-1 maps bytes to code
/// points directly. Unknown charsets are treated as UTF-8.
///
/// # Errors
///
/// Returns an error if the bytes are not valid in the charset.
pub fn decode_charset(bytes: &[u8], charset: &str) -> Result<String> {
    match charset.trim().to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" | "latin-1" => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        _ => String::from_utf8(bytes.to_vec()).map_err(Into::into),
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
    fn test_base64_decode_ignores_line_breaks() {
        let decoded = decode_base64("SGVs\r\nbG8s\r\nIFdvcmxkIQ==\r\n").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_wrapped_line_length() {
        let data = vec![0xAB; 200];
        let wrapped = encode_base64_wrapped(&data);
        for line in wrapped.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        assert_eq!(decode_base64(&wrapped).unwrap(), data);
    }

    #[test]
    fn test_base64_invalid() {
        assert!(decode_base64("not base64!!").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello").unwrap(), b"Hello");
        assert_eq!(
            decode_quoted_printable(b"H=C3=A9llo").unwrap(),
            "Héllo".as_bytes()
        );
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(
            decode_quoted_printable(b"Hello=\r\nWorld").unwrap(),
            b"HelloWorld"
        );
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld").unwrap(), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable(b"broken=4").is_err());
        assert!(decode_quoted_printable(b"broken=ZZ").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");

        let encoded = encode_rfc2047("Héllo");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_decode_plain() {
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
    }

    #[test]
    fn test_rfc2047_decode_embedded_word() {
        let decoded = decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= there").unwrap();
        assert_eq!(decoded, "Re: Héllo there");
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        let decoded = decode_rfc2047("=?utf-8?Q?H=C3=A9?= =?utf-8?Q?llo?=").unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_q_underscore_is_space() {
        let decoded = decode_rfc2047("=?iso-8859-1?Q?caf=E9_noir?=").unwrap();
        assert_eq!(decoded, "café noir");
    }

    #[test]
    fn test_rfc2047_unterminated_word_is_literal() {
        assert_eq!(decode_rfc2047("a =? b").unwrap(), "a =? b");
    }

    #[test]
    fn test_rfc2047_unknown_encoding() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }
}
