//! Server capabilities.

/// A capability advertised in a CAPABILITY response or response code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// IMAP4rev1
    Imap4Rev1,
    /// IMAP4rev2
    Imap4Rev2,
    /// STARTTLS
    StartTls,
    /// LOGINDISABLED
    LoginDisabled,
    /// LITERAL+ (non-synchronizing literals)
    LiteralPlus,
    /// AUTH=<mechanism>, mechanism uppercased.
    Auth(String),
    /// Anything else, uppercased.
    Other(String),
}

impl Capability {
    /// Parses one capability atom.
    #[must_use]
    pub fn parse(atom: &str) -> Self {
        let upper = atom.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "LITERAL+" => Self::LiteralPlus,
            _ => upper
                .strip_prefix("AUTH=")
                .map_or_else(|| Self::Other(upper.clone()), |m| Self::Auth(m.to_string())),
        }
    }

    /// Parses a space-separated capability list.
    #[must_use]
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split_ascii_whitespace().map(Self::parse).collect()
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

    #[test]
    fn test_parse_list() {
        let caps = Capability::parse_list("IMAP4rev1 starttls AUTH=PLAIN LITERAL+ X-GM-EXT-1");
        assert_eq!(
            caps,
            vec![
                Capability::Imap4Rev1,
                Capability::StartTls,
                Capability::Auth("PLAIN".to_string()),
                Capability::LiteralPlus,
                Capability::Other("X-GM-EXT-1".to_string()),
            ]
        );
    }
}
