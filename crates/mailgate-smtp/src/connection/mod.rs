//! Connection management with a type-state client.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// What the server told us in its greeting and EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Advertised extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Advertised SIZE limit, if any.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Advertised AUTH mechanisms this client can use.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Picks PLAIN when offered, then LOGIN, defaulting to PLAIN when the
    /// server lists neither.
    #[must_use]
    pub fn preferred_auth(&self) -> AuthMechanism {
        let offered = self.auth_mechanisms();
        if !offered.contains(&AuthMechanism::Plain) && offered.contains(&AuthMechanism::Login) {
            AuthMechanism::Login
        } else {
            AuthMechanism::Plain
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "smtp.example.com".to_string(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_capabilities() {
        let info = info(&["STARTTLS", "SIZE 1000", "AUTH LOGIN"]);
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(info.preferred_auth(), AuthMechanism::Login);
    }

    #[test]
    fn test_preferred_auth_defaults_to_plain() {
        assert_eq!(info(&[]).preferred_auth(), AuthMechanism::Plain);
        assert_eq!(info(&["AUTH LOGIN PLAIN"]).preferred_auth(), AuthMechanism::Plain);
    }
}
