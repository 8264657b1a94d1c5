//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// A client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO
    Ehlo {
        /// Client identity.
        hostname: String,
    },
    /// STARTTLS
    StartTls,
    /// AUTH with an optional initial response.
    Auth {
        /// Mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response.
        initial_response: Option<String>,
    },
    /// Base64 line answering a 334 challenge.
    AuthResponse(String),
    /// MAIL FROM
    MailFrom {
        /// Reverse path.
        from: Address,
        /// Declared message size.
        size: Option<usize>,
    },
    /// RCPT TO
    RcptTo {
        /// Forward path.
        to: Address,
    },
    /// DATA
    Data,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command with its trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => format!("AUTH {} {response}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(response) => response.clone(),
            Self::MailFrom { from, size: None } => format!("MAIL FROM:<{from}>"),
            Self::MailFrom {
                from,
                size: Some(size),
            } => format!("MAIL FROM:<{from}> SIZE={size}"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Command name safe to log. Never includes credentials.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}

/// Prepares message content for the DATA phase.
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// byte-stuffed (RFC 5321 section 4.5.2) and the terminating `.` line is
/// appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);

    let body = message
        .strip_suffix(b"\r\n")
        .or_else(|| message.strip_suffix(b"\n"))
        .unwrap_or(message);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "relay.local".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO relay.local\r\n");
    }

    #[test]
    fn test_auth_plain_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
        assert_eq!(cmd.verb(), "AUTH");
    }

    #[test]
    fn test_auth_login_without_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
    }

    #[test]
    fn test_mail_from() {
        let from = Address::new("relay@example.com").unwrap();
        let cmd = Command::MailFrom {
            from: from.clone(),
            size: None,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<relay@example.com>\r\n");

        let cmd = Command::MailFrom {
            from,
            size: Some(2048),
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<relay@example.com> SIZE=2048\r\n");
    }

    #[test]
    fn test_rcpt_to() {
        let cmd = Command::RcptTo {
            to: Address::new("alice@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<alice@example.com>\r\n");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_encode_data_stuffs_dots() {
        let encoded = encode_data(b"Subject: x\r\n\r\n.hidden\r\n..two\r\nend\r\n");
        assert_eq!(
            encoded,
            b"Subject: x\r\n\r\n..hidden\r\n...two\r\nend\r\n.\r\n".to_vec()
        );
    }

    #[test]
    fn test_encode_data_normalizes_bare_lf() {
        assert_eq!(encode_data(b"a\nb"), b"a\r\nb\r\n.\r\n".to_vec());
    }

    #[test]
    fn test_encode_data_lone_dot_line() {
        assert_eq!(encode_data(b"before\r\n.\r\nafter"), b"before\r\n..\r\nafter\r\n.\r\n".to_vec());
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n".to_vec());
    }
}
