//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Upper bound on lines in one reply.
const MAX_REPLY_LINES: usize = 512;

/// Parses a reply from its lines (CRLF already stripped).
///
/// Single-line: `250 OK`. Multi-line: `250-first`, `250-second`, `250 last`.
/// Every line must carry the same code.
///
/// # Errors
///
/// Returns an error if the reply is empty or a line is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;
    let code = parse_code(first)?;

    let mut text = Vec::with_capacity(lines.len());
    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        text.push(line.get(4..).unwrap_or_default().to_string());
    }

    Ok(Reply::new(ReplyCode::new(code), text))
}

fn parse_code(line: &str) -> Result<u16> {
    let code = line
        .get(..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Malformed reply line: {line}")))?;

    match line.as_bytes().get(3) {
        None | Some(b' ' | b'-') => {}
        Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
    }

    code.parse()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code}")))
}

/// Checks if a line ends a reply (`250 text` or a bare `250`).
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3).is_none_or(|&b| b != b'-')
}

/// Reads one complete reply from a buffered reader.
///
/// # Errors
///
/// Returns an I/O error of kind `UnexpectedEof` if the server closes the
/// connection mid-reply, or a protocol error for malformed lines.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
        if lines.len() > MAX_REPLY_LINES {
            return Err(Error::Protocol("Reply has too many lines".into()));
        }
    }

    parse_reply(&lines)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&["250 OK".to_string()]).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines, vec!["OK"]);
    }

    #[test]
    fn test_parse_multi_line_reply() {
        let lines = vec![
            "250-smtp.example.com".to_string(),
            "250-AUTH PLAIN LOGIN".to_string(),
            "250 STARTTLS".to_string(),
        ];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.lines, vec!["smtp.example.com", "AUTH PLAIN LOGIN", "STARTTLS"]);
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&["250".to_string()]).unwrap();
        assert_eq!(reply.lines, vec![""]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&["25".to_string()]).is_err());
        assert!(parse_reply(&["ABC OK".to_string()]).is_err());
        assert!(parse_reply(&["250xOK".to_string()]).is_err());
        assert!(parse_reply(&["250-a".to_string(), "251 b".to_string()]).is_err());
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
    }

    #[tokio::test]
    async fn test_read_reply_multi_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"250-first\r\n250-")
            .read(b"second\r\n250 last\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let reply = read_reply(&mut reader).await.unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines.len(), 3);
    }

    #[tokio::test]
    async fn test_read_reply_eof() {
        let mock = tokio_test::io::Builder::new().read(b"250-partial\r\n").build();
        let mut reader = BufReader::new(mock);

        let err = read_reply(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
