//! Envelope addresses.

use crate::error::{Error, Result};

/// Maximum path length (RFC 5321 section 4.5.3.1.3).
const MAX_PATH_LENGTH: usize = 256;

/// Bare `local@domain` address used in `MAIL FROM` and `RCPT TO`.
///
/// Construction rejects anything that could escape the angle brackets of
/// the envelope command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Validates and wraps an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, too long, contains
    /// whitespace, control characters or angle brackets, or does not have
    /// exactly one `@` separating non-empty parts.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("address is empty".into()));
        }
        if addr.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidAddress(format!(
                "address longer than {MAX_PATH_LENGTH} bytes"
            )));
        }
        if addr.contains(|c: char| c.is_whitespace() || c.is_control() || c == '<' || c == '>') {
            return Err(Error::InvalidAddress(format!("{addr:?} contains a forbidden character")));
        }

        match addr.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Self(addr))
            }
            _ => Err(Error::InvalidAddress(format!(
                "{addr:?} is not of the form local@domain"
            ))),
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "userexample.com", "@example.com", "user@", "a@b@c"] {
            assert!(Address::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_rejects_command_injection() {
        assert!(Address::new("a@example.com>\r\nDATA").is_err());
        assert!(Address::new("a b@example.com").is_err());
        assert!(Address::new("<a@example.com>").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let long = format!("{}@example.com", "a".repeat(300));
        assert!(Address::new(long).is_err());
    }
}
