//! Core IMAP types.

mod capability;
mod sequence;

pub use capability::Capability;
pub use sequence::SequenceSet;

/// Status of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK
    Ok,
    /// NO
    No,
    /// BAD
    Bad,
    /// PREAUTH (greeting only)
    PreAuth,
    /// BYE
    Bye,
}

impl Status {
    /// Parses a status keyword, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true for OK and PREAUTH.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// Mailbox state reported by SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Mailbox name as selected.
    pub name: String,
    /// Number of messages.
    pub exists: u32,
    /// Number of messages with the \Recent flag.
    pub recent: u32,
    /// UIDVALIDITY, if reported.
    pub uid_validity: Option<u32>,
    /// UIDNEXT, if reported.
    pub uid_next: Option<u32>,
    /// True when the server answered `[READ-ONLY]`.
    pub read_only: bool,
}

/// Bracketed code carried by a condition response, e.g. `[UIDNEXT 42]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `[ALERT]`
    Alert,
    /// `[CAPABILITY ...]`
    Capability(Vec<Capability>),
    /// `[READ-ONLY]`
    ReadOnly,
    /// `[READ-WRITE]`
    ReadWrite,
    /// `[UIDVALIDITY n]`
    UidValidity(u32),
    /// `[UIDNEXT n]`
    UidNext(u32),
    /// Any other code, kept verbatim.
    Other(String),
}

impl ResponseCode {
    /// Parses the text between the brackets.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (name, arg) = text
            .split_once(' ')
            .map_or((text, ""), |(name, arg)| (name, arg.trim()));

        match name.to_ascii_uppercase().as_str() {
            "ALERT" => Self::Alert,
            "CAPABILITY" => Self::Capability(Capability::parse_list(arg)),
            "READ-ONLY" => Self::ReadOnly,
            "READ-WRITE" => Self::ReadWrite,
            "UIDVALIDITY" => arg
                .parse()
                .map_or_else(|_| Self::Other(text.to_string()), Self::UidValidity),
            "UIDNEXT" => arg
                .parse()
                .map_or_else(|_| Self::Other(text.to_string()), Self::UidNext),
            _ => Self::Other(text.to_string()),
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

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("ok"), Some(Status::Ok));
        assert_eq!(Status::parse("PREAUTH"), Some(Status::PreAuth));
        assert_eq!(Status::parse("MAYBE"), None);
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
    }

    #[test]
    fn test_response_code_parse() {
        assert_eq!(ResponseCode::parse("UIDNEXT 42"), ResponseCode::UidNext(42));
        assert_eq!(ResponseCode::parse("read-only"), ResponseCode::ReadOnly);
        assert_eq!(
            ResponseCode::parse("UIDVALIDITY x"),
            ResponseCode::Other("UIDVALIDITY x".to_string())
        );
        assert!(matches!(
            ResponseCode::parse("CAPABILITY IMAP4rev1 STARTTLS"),
            ResponseCode::Capability(caps) if caps.len() == 2
        ));
    }
}
