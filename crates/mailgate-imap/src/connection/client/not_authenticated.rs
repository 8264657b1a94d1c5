//! Greeting, STARTTLS and LOGIN.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the server greeting from a freshly connected stream.
    ///
    /// Capabilities announced in the greeting's response code are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bye`] if the server refuses the connection and a
    /// protocol error for anything other than an OK or PREAUTH greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = framed.read_response().await?;

        let code = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => code,
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };
        let capabilities = match code {
            Some(ResponseCode::Capability(caps)) => caps,
            _ => Vec::new(),
        };
        debug!(capabilities = capabilities.len(), "IMAP greeting received");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            _state: PhantomData,
        })
    }

    /// Logs in with a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`] when the server rejects the credentials and
    /// [`Error::InvalidState`] when the server advertises LOGINDISABLED.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::InvalidState(
                "server disabled LOGIN on this connection".to_string(),
            ));
        }

        let responses = self
            .execute(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.absorb_capabilities(&responses);

        Ok(self.into_state())
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection with STARTTLS and refreshes capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects STARTTLS, sent data before
    /// the handshake, or the TLS handshake fails.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.execute(&Command::StartTls).await?;

        let stream = self.stream.into_inner()?.upgrade_to_tls(host).await?;
        let mut client = Self {
            stream: FramedStream::new(stream),
            tag_gen: self.tag_gen,
            capabilities: Vec::new(),
            _state: PhantomData,
        };
        client.capability().await?;
        Ok(client)
    }
}
