//! Type-state IMAP client.
//!
//! The connection moves through three states, each exposing only the
//! commands valid there:
//!
//! - [`NotAuthenticated`]: after the greeting; STARTTLS and LOGIN.
//! - [`Authenticated`]: after LOGIN; SELECT.
//! - [`Selected`]: with a mailbox open; SEARCH and FETCH.
//!
//! Transitions consume the client, so a failed LOGIN or SELECT drops the
//! connection.

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::io;
use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, Status};
use crate::{Error, Result};

/// IMAP client connection in state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            _state: PhantomData,
        }
    }

    /// Capabilities from the greeting or the latest CAPABILITY response.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for a capability.
    #[must_use]
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Sends CAPABILITY and stores the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the connection breaks.
    pub async fn capability(&mut self) -> Result<&[Capability]> {
        let responses = self.execute(&Command::Capability).await?;
        self.absorb_capabilities(&responses);
        Ok(&self.capabilities)
    }

    /// Ends the session. A server that hangs up after BYE is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects LOGOUT or the write fails.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(_) => Ok(()),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn absorb_capabilities(&mut self, responses: &[UntaggedResponse]) {
        for response in responses {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities.clone_from(caps);
            }
        }
    }

    /// Runs one command to completion and returns its untagged data.
    ///
    /// Arguments sent as synchronizing literals are written one chunk at a
    /// time, each after the server's `+` continuation.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Vec<UntaggedResponse>> {
        let tag = self.tag_gen.next_tag();
        let chunks = command.serialize(&tag)?;
        debug!(command = command.name(), %tag, "sending IMAP command");

        let mut untagged = Vec::new();
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            self.stream.write_command(chunk).await?;
            if i < last {
                self.await_continuation(&tag, &mut untagged).await?;
            }
        }

        let raw = ResponseAccumulator::new(tag.as_str())
            .read_until_tagged(&mut self.stream)
            .await?;
        for bytes in &raw {
            match ResponseParser::parse(bytes)? {
                Response::Untagged(response) => untagged.push(response),
                Response::Tagged { status, text, .. } => {
                    check_status(status, text)?;
                }
                Response::Continuation(_) => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation during {}",
                        command.name()
                    )));
                }
            }
        }

        debug!(command = command.name(), %tag, responses = untagged.len(), "IMAP command completed");
        Ok(untagged)
    }

    async fn await_continuation(
        &mut self,
        tag: &str,
        untagged: &mut Vec<UntaggedResponse>,
    ) -> Result<()> {
        loop {
            let bytes = self.stream.read_response().await?;
            match ResponseParser::parse(&bytes)? {
                Response::Continuation(_) => return Ok(()),
                Response::Untagged(response) => untagged.push(response),
                Response::Tagged {
                    tag: t,
                    status,
                    text,
                    ..
                } if t == tag => {
                    check_status(status, text)?;
                    return Err(Error::Protocol(
                        "command completed before its literal was sent".to_string(),
                    ));
                }
                Response::Tagged { tag: t, .. } => {
                    return Err(Error::Protocol(format!("response for unknown tag {t}")));
                }
            }
        }
    }
}

/// Maps a tagged completion status to a result.
fn check_status(status: Status, text: String) -> Result<()> {
    match status {
        Status::Ok | Status::PreAuth => Ok(()),
        Status::No => Err(Error::No(text)),
        Status::Bad => Err(Error::Bad(text)),
        Status::Bye => Err(Error::Bye(text)),
    }
}
