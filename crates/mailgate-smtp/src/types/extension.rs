//! EHLO keywords.

/// Service extension advertised in an EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS
    StartTls,
    /// AUTH with the mechanisms this client understands.
    Auth(Vec<AuthMechanism>),
    /// SIZE with the optional limit in bytes.
    Size(Option<usize>),
    /// 8BITMIME
    EightBitMime,
    /// PIPELINING
    Pipelining,
    /// SMTPUTF8
    SmtpUtf8,
    /// Any other keyword, uppercased.
    Other(String),
}

impl Extension {
    /// Parses one EHLO line (without the reply code).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_uppercase();

        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok()).filter(|&n| n > 0)),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Other(keyword),
        }
    }
}

/// SASL mechanisms supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616), sent as an initial response.
    Plain,
    /// LOGIN, the legacy two-step username/password exchange.
    Login,
}

impl AuthMechanism {
    /// Parses a mechanism name. Unsupported mechanisms return `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if s.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_case_insensitive() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_keeps_known_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH LOGIN PLAIN XOAUTH2"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(Extension::parse("SIZE 0"), Extension::Size(None));
    }

    #[test]
    fn parse_other() {
        assert_eq!(
            Extension::parse("chunking"),
            Extension::Other("CHUNKING".to_string())
        );
    }
}
