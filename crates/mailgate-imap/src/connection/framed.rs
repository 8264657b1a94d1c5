//! Response framing.
//!
//! A response is one CRLF-terminated line, extended by every literal it
//! announces: a line ending in `{n}\r\n` is followed by `n` raw bytes and
//! then the rest of the response.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const BUFFER_SIZE: usize = 8192;

/// Longest line accepted before giving up on the server.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Largest literal accepted, which bounds the size of a fetched message.
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024;

/// Buffered stream that reads whole responses.
#[derive(Debug)]
pub struct FramedStream<S> {
    reader: BufReader<S>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(BUFFER_SIZE, stream),
        }
    }

    /// Reads one complete response, literals included.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the server closes the connection, or a
    /// protocol error if a line or literal exceeds the size limits.
    pub async fn read_response(&mut self) -> Result<Bytes> {
        let mut response = BytesMut::with_capacity(BUFFER_SIZE);

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(len) = literal_length(&line) else {
                return Ok(response.freeze());
            };
            if len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal of {len} bytes exceeds the {MAX_LITERAL_SIZE} byte limit"
                )));
            }

            let start = response.len();
            response.resize(start + len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }

            // A CR may end one read and its LF start the next.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                return Ok(line);
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("response line too long".to_string()));
            }
        }
    }

    /// Writes and flushes raw command bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Returns the inner stream for a TLS upgrade.
    ///
    /// # Errors
    ///
    /// Fails if the server sent bytes past the last response, which would
    /// otherwise be lost or injected into the plaintext phase.
    pub fn into_inner(self) -> Result<S> {
        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "unexpected data buffered before TLS negotiation".to_string(),
            ));
        }
        Ok(self.reader.into_inner())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Length announced by a trailing `{n}\r\n` or `{n+}\r\n`.
fn literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Collects responses up to the tagged completion of one command.
#[derive(Debug)]
pub struct ResponseAccumulator {
    tag: String,
    responses: Vec<Bytes>,
}

impl ResponseAccumulator {
    /// Creates an accumulator waiting for `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            responses: Vec::new(),
        }
    }

    /// Reads until the response tagged with our tag, which is returned last.
    ///
    /// # Errors
    ///
    /// Returns any read error from the stream.
    pub async fn read_until_tagged<S>(&mut self, framed: &mut FramedStream<S>) -> Result<Vec<Bytes>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let response = framed.read_response().await?;
            let done = response
                .strip_prefix(self.tag.as_bytes())
                .is_some_and(|rest| rest.first() == Some(&b' '));
            self.responses.push(response);
            if done {
                return Ok(std::mem::take(&mut self.responses));
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
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"* 1 FETCH (RFC822 {123}\r\n"), Some(123));
        assert_eq!(literal_length(b"{7+}\r\n"), Some(7));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"no literal\r\n"), None);
        assert_eq!(literal_length(b"{}\r\n"), None);
        assert_eq!(literal_length(b"{12a}\r\n"), None);
        assert_eq!(literal_length(b"{12}"), None);
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(&framed.read_response().await.unwrap()[..], b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_literal_across_reads() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (RFC822 {12}\r\nSubject")
            .read(b": x\r\n)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(
            &framed.read_response().await.unwrap()[..],
            b"* 1 FETCH (RFC822 {12}\r\nSubject: x\r\n)\r\n"
        );
    }

    #[tokio::test]
    async fn test_crlf_split_between_reads() {
        let mock = Builder::new().read(b"A1 OK done\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(&framed.read_response().await.unwrap()[..], b"A1 OK done\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);
        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (RFC822 {999999999999}\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        assert!(matches!(
            framed.read_response().await.unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[tokio::test]
    async fn test_accumulator_stops_at_own_tag() {
        let mock = Builder::new()
            .read(b"* SEARCH 1 2\r\n")
            .read(b"A00 OK not ours\r\n")
            .read(b"A0001 OK SEARCH completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = ResponseAccumulator::new("A0001")
            .read_until_tagged(&mut framed)
            .await
            .unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(&responses[2][..], b"A0001 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn test_into_inner_rejects_buffered_data() {
        let mock = Builder::new().read(b"A1 OK begin TLS\r\ninjected").build();
        let mut framed = FramedStream::new(mock);
        framed.read_response().await.unwrap();
        assert!(framed.into_inner().is_err());
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
    }
}
