//! Plaintext and TLS transports, buffered for line-oriented replies.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::error::{Error, Result};
use crate::parser::read_reply;
use crate::types::Reply;

/// A buffered TCP stream, optionally wrapped in TLS.
#[derive(Debug)]
pub enum SmtpStream {
    /// Plaintext TCP, before STARTTLS or on a local relay.
    Plain(BufReader<TcpStream>),
    /// TLS over TCP.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads one complete, possibly multi-line, reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the reply is malformed.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        match self {
            Self::Plain(reader) => read_reply(reader).await,
            Self::Tls(reader) => read_reply(reader.as_mut()).await,
        }
    }

    /// Writes `data` and flushes it to the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.writer();
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    fn writer(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        match self {
            Self::Plain(reader) => reader.get_mut(),
            Self::Tls(reader) => reader.get_mut(),
        }
    }

    /// Returns true once the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Runs the TLS handshake after the server accepted STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already TLS, if the server sent
    /// bytes ahead of the handshake, or if the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let Self::Plain(reader) = self else {
            return Err(Error::Protocol("STARTTLS on an encrypted stream".into()));
        };
        if !reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "server sent data ahead of the TLS handshake".into(),
            ));
        }

        let tls = handshake(hostname, reader.into_inner()).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls))))
    }
}

/// Connects in plaintext, for STARTTLS on port 587 or a local relay.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    Ok(SmtpStream::Plain(BufReader::new(tcp)))
}

/// Connects and negotiates TLS immediately (port 465 style).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    let tls = handshake(hostname, tcp).await?;
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls))))
}

async fn handshake(hostname: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::InvalidServerName(hostname.to_string()))?;

    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config))
        .connect(server_name, tcp)
        .await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_upgrade_refuses_buffered_plaintext() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 ready\r\n220 injected\r\n").await.unwrap();
            socket
        });

        let mut stream = connect("127.0.0.1", port).await.unwrap();
        assert!(!stream.is_tls());
        // Let both lines arrive so they land in one buffer fill.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let reply = stream.read_reply().await.unwrap();
        assert_eq!(reply.code.as_u16(), 220);

        let err = stream.upgrade_to_tls("localhost").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_server_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move { listener.accept().await.unwrap() });

        let stream = connect("127.0.0.1", port).await.unwrap();
        let err = stream.upgrade_to_tls("not a host name").await.unwrap_err();
        assert!(matches!(err, Error::InvalidServerName(_)));
    }
}
