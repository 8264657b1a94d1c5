//! IMAP commands.

mod serialize;
mod tag_generator;

pub use serialize::CommandWriter;
pub use tag_generator::TagGenerator;

use crate::Result;
use crate::types::SequenceSet;

/// Message data item requested by FETCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Full message (sets \Seen).
    Rfc822,
    /// Message size in octets.
    Rfc822Size,
    /// Flags.
    Flags,
    /// UID.
    Uid,
}

impl FetchAttribute {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Rfc822 => "RFC822",
            Self::Rfc822Size => "RFC822.SIZE",
            Self::Flags => "FLAGS",
            Self::Uid => "UID",
        }
    }
}

/// A client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY
    Capability,
    /// LOGOUT
    Logout,
    /// STARTTLS
    StartTls,
    /// LOGIN
    Login {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// SEARCH ALL
    SearchAll,
    /// FETCH
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Data items.
        items: Vec<FetchAttribute>,
    },
}

impl Command {
    /// Serializes the command with `tag` into literal-separated chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be encoded.
    pub fn serialize(&self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut w = CommandWriter::new(tag);

        match self {
            Self::Capability => {
                w.token("CAPABILITY");
            }
            Self::Logout => {
                w.token("LOGOUT");
            }
            Self::StartTls => {
                w.token("STARTTLS");
            }
            Self::Login { username, password } => {
                w.token("LOGIN").astring(username)?.astring(password)?;
            }
            Self::Select { mailbox } => {
                w.token("SELECT").astring(mailbox)?;
            }
            Self::SearchAll => {
                w.token("SEARCH").token("ALL");
            }
            Self::Fetch { sequence, items } => {
                w.token("FETCH").token(&sequence.to_string());
                let names: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
                match names.as_slice() {
                    [single] => w.token(single),
                    _ => w.token(&format!("({})", names.join(" "))),
                };
            }
        }

        Ok(w.finish())
    }

    /// Command name safe to log. Never includes credentials.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::SearchAll => "SEARCH",
            Self::Fetch { .. } => "FETCH",
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

    fn line(cmd: &Command) -> Vec<u8> {
        let chunks = cmd.serialize("A0001").unwrap();
        assert_eq!(chunks.len(), 1);
        chunks.into_iter().next().unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(line(&Command::Capability), b"A0001 CAPABILITY\r\n");
        assert_eq!(line(&Command::Logout), b"A0001 LOGOUT\r\n");
        assert_eq!(line(&Command::SearchAll), b"A0001 SEARCH ALL\r\n");
    }

    #[test]
    fn test_login_quotes_password() {
        let cmd = Command::Login {
            username: "relay@example.com".to_string(),
            password: "two words".to_string(),
        };
        assert_eq!(line(&cmd), b"A0001 LOGIN relay@example.com \"two words\"\r\n");
        assert_eq!(cmd.name(), "LOGIN");
    }

    #[test]
    fn test_select_inbox() {
        let cmd = Command::Select {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(line(&cmd), b"A0001 SELECT INBOX\r\n");
    }

    #[test]
    fn test_fetch() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::single(42).unwrap(),
            items: vec![FetchAttribute::Rfc822],
        };
        assert_eq!(line(&cmd), b"A0001 FETCH 42 RFC822\r\n");

        let cmd = Command::Fetch {
            sequence: SequenceSet::range(1, 3).unwrap(),
            items: vec![FetchAttribute::Uid, FetchAttribute::Rfc822Size],
        };
        assert_eq!(line(&cmd), b"A0001 FETCH 1:3 (UID RFC822.SIZE)\r\n");
    }
}
