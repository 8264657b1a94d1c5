//! Response types and the parser that builds them.

use super::lexer::Cursor;
use crate::types::{Capability, ResponseCode, Status};
use crate::Result;

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// The command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// Continuation request (`+`).
    Continuation(String),
}

impl Response {
    /// Returns true if this is the tagged completion for `tag`.
    #[must_use]
    pub fn is_tagged(&self, tag: &str) -> bool {
        matches!(self, Self::Tagged { tag: t, .. } if t == tag)
    }
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH` (greeting only)
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* FLAGS (...)`
    Flags(Vec<String>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(u32),
    /// `* SEARCH ...`
    Search(Vec<u32>),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Data items the client understands; others are skipped.
        items: Vec<FetchItem>,
    },
    /// Any other untagged data, kept as its first line.
    Other(String),
}

/// One item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `RFC822`, the full message. `None` for NIL.
    Rfc822(Option<Vec<u8>>),
    /// `RFC822.SIZE`
    Rfc822Size(u32),
    /// `UID`
    Uid(u32),
    /// `FLAGS`
    Flags(Vec<String>),
    /// `BODY[section]`
    Body {
        /// Section text between the brackets; empty for the whole message.
        section: String,
        /// Section content. `None` for NIL.
        data: Option<Vec<u8>>,
    },
}

/// Parser for framed server responses.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`](crate::Error::Protocol) for malformed input.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut cursor = Cursor::new(input);

        if cursor.eat(b'+') {
            cursor.skip_spaces();
            return Ok(Response::Continuation(cursor.rest_of_line()));
        }
        if cursor.eat(b'*') {
            cursor.expect(b' ')?;
            return Self::parse_untagged(&mut cursor).map(Response::Untagged);
        }

        let tag = cursor.atom()?.to_string();
        cursor.expect(b' ')?;
        let status = Self::parse_status(&mut cursor)?;
        let (code, text) = Self::parse_resp_text(&mut cursor)?;
        Ok(Response::Tagged {
            tag,
            status,
            code,
            text,
        })
    }

    fn parse_status(cursor: &mut Cursor<'_>) -> Result<Status> {
        let word = cursor.atom()?;
        Status::parse(word).ok_or_else(|| cursor.error(&format!("unknown status {word:?}")))
    }

    /// Parses `[SP] ["[" code "]" SP] text`. Servers may omit the text.
    fn parse_resp_text(cursor: &mut Cursor<'_>) -> Result<(Option<ResponseCode>, String)> {
        cursor.skip_spaces();
        let code = if cursor.eat(b'[') {
            let raw = cursor.until(b']')?;
            cursor.expect(b']')?;
            cursor.skip_spaces();
            Some(ResponseCode::parse(&String::from_utf8_lossy(raw)))
        } else {
            None
        };
        Ok((code, cursor.rest_of_line()))
    }

    fn parse_untagged(cursor: &mut Cursor<'_>) -> Result<UntaggedResponse> {
        if cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
            let number = cursor.number()?;
            cursor.expect(b' ')?;
            let keyword = cursor.atom()?.to_ascii_uppercase();
            return match keyword.as_str() {
                "EXISTS" => Ok(UntaggedResponse::Exists(number)),
                "RECENT" => Ok(UntaggedResponse::Recent(number)),
                "EXPUNGE" => Ok(UntaggedResponse::Expunge(number)),
                "FETCH" => {
                    cursor.expect(b' ')?;
                    let items = Self::parse_fetch_items(cursor)?;
                    Ok(UntaggedResponse::Fetch { seq: number, items })
                }
                _ => Ok(UntaggedResponse::Other(format!(
                    "{number} {keyword} {}",
                    cursor.rest_of_line()
                ))),
            };
        }

        let keyword = cursor.atom()?.to_ascii_uppercase();
        match keyword.as_str() {
            "OK" | "NO" | "BAD" | "PREAUTH" | "BYE" => {
                let (code, text) = Self::parse_resp_text(cursor)?;
                Ok(match keyword.as_str() {
                    "OK" => UntaggedResponse::Ok { code, text },
                    "NO" => UntaggedResponse::No { code, text },
                    "BAD" => UntaggedResponse::Bad { code, text },
                    "PREAUTH" => UntaggedResponse::PreAuth { code, text },
                    _ => UntaggedResponse::Bye { code, text },
                })
            }
            "CAPABILITY" => Ok(UntaggedResponse::Capability(Capability::parse_list(
                &cursor.rest_of_line(),
            ))),
            "FLAGS" => {
                cursor.skip_spaces();
                Self::parse_flag_list(cursor).map(UntaggedResponse::Flags)
            }
            "SEARCH" => {
                let mut numbers = Vec::new();
                loop {
                    cursor.skip_spaces();
                    if cursor.at_line_end() {
                        break;
                    }
                    numbers.push(cursor.number()?);
                }
                Ok(UntaggedResponse::Search(numbers))
            }
            _ => Ok(UntaggedResponse::Other(format!(
                "{keyword}{}",
                cursor.rest_of_line()
            ))),
        }
    }

    fn parse_flag_list(cursor: &mut Cursor<'_>) -> Result<Vec<String>> {
        cursor.expect(b'(')?;
        let mut flags = Vec::new();
        loop {
            cursor.skip_spaces();
            if cursor.eat(b')') {
                return Ok(flags);
            }
            flags.push(cursor.atom()?.to_string());
        }
    }

    fn parse_fetch_items(cursor: &mut Cursor<'_>) -> Result<Vec<FetchItem>> {
        cursor.expect(b'(')?;
        let mut items = Vec::new();

        loop {
            cursor.skip_spaces();
            if cursor.eat(b')') {
                return Ok(items);
            }
            if cursor.at_line_end() {
                return Err(cursor.error("unterminated FETCH data"));
            }

            let name = cursor.atom()?.to_ascii_uppercase();
            let section = if cursor.eat(b'[') {
                let raw = String::from_utf8_lossy(cursor.until(b']')?).into_owned();
                cursor.expect(b']')?;
                // Partial fetch origin, e.g. BODY[]<0>.
                if cursor.eat(b'<') {
                    cursor.until(b'>')?;
                    cursor.expect(b'>')?;
                }
                Some(raw)
            } else {
                None
            };
            cursor.expect(b' ')?;

            match (name.as_str(), section) {
                ("RFC822", None) => items.push(FetchItem::Rfc822(cursor.nstring()?)),
                ("RFC822.SIZE", None) => items.push(FetchItem::Rfc822Size(cursor.number()?)),
                ("UID", None) => items.push(FetchItem::Uid(cursor.number()?)),
                ("FLAGS", None) => items.push(FetchItem::Flags(Self::parse_flag_list(cursor)?)),
                ("BODY" | "BINARY", Some(section)) => items.push(FetchItem::Body {
                    section,
                    data: cursor.nstring()?,
                }),
                _ => cursor.skip_value()?,
            }
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
    fn test_tagged_ok_with_code() {
        let response = ResponseParser::parse(b"A0002 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: "A0002".to_string(),
                status: Status::Ok,
                code: Some(ResponseCode::ReadWrite),
                text: "SELECT completed".to_string(),
            }
        );
        assert!(response.is_tagged("A0002"));
        assert!(!response.is_tagged("A0003"));
    }

    #[test]
    fn test_tagged_without_text() {
        let response = ResponseParser::parse(b"A1 NO\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Tagged { status: Status::No, text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn test_greeting_with_capabilities() {
        let response =
            ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Ok { code, text }) = response else {
            panic!("expected untagged OK");
        };
        assert_eq!(text, "ready");
        assert_eq!(
            code,
            Some(ResponseCode::Capability(vec![
                Capability::Imap4Rev1,
                Capability::Auth("PLAIN".to_string())
            ]))
        );
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal data\r\n").unwrap(),
            Response::Continuation("Ready for literal data".to_string())
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation(String::new())
        );
    }

    #[test]
    fn test_numeric_untagged() {
        assert_eq!(
            ResponseParser::parse(b"* 18 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(18))
        );
        assert_eq!(
            ResponseParser::parse(b"* 2 RECENT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Recent(2))
        );
        assert_eq!(
            ResponseParser::parse(b"* 4 EXPUNGE\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Expunge(4))
        );
    }

    #[test]
    fn test_search() {
        assert_eq!(
            ResponseParser::parse(b"* SEARCH 2 3 7\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![2, 3, 7]))
        );
        assert_eq!(
            ResponseParser::parse(b"* SEARCH\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![]))
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            ResponseParser::parse(b"* FLAGS (\\Answered \\Seen)\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Flags(vec![
                "\\Answered".to_string(),
                "\\Seen".to_string()
            ]))
        );
    }

    #[test]
    fn test_fetch_rfc822_literal() {
        let input = b"* 5 FETCH (UID 42 RFC822 {11}\r\nhello\r\nbody FLAGS (\\Seen))\r\n";
        let response = ResponseParser::parse(input).unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Fetch {
                seq: 5,
                items: vec![
                    FetchItem::Uid(42),
                    FetchItem::Rfc822(Some(b"hello\r\nbody".to_vec())),
                    FetchItem::Flags(vec!["\\Seen".to_string()]),
                ],
            })
        );
    }

    #[test]
    fn test_fetch_body_section_and_unknown_items() {
        let input =
            b"* 1 FETCH (INTERNALDATE \"17-Oct-2026 09:00:00 +0000\" BODY[] {2}\r\nhi ENVELOPE (NIL \"x\" ((NIL NIL \"a\" \"b\"))))\r\n";
        let Response::Untagged(UntaggedResponse::Fetch { items, .. }) =
            ResponseParser::parse(input).unwrap()
        else {
            panic!("expected FETCH");
        };
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: String::new(),
                data: Some(b"hi".to_vec())
            }]
        );
    }

    #[test]
    fn test_fetch_nil_message() {
        let response = ResponseParser::parse(b"* 1 FETCH (RFC822 NIL)\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Fetch {
                seq: 1,
                items: vec![FetchItem::Rfc822(None)]
            })
        );
    }

    #[test]
    fn test_malformed() {
        assert!(ResponseParser::parse(b"").is_err());
        assert!(ResponseParser::parse(b"A1 MAYBE done\r\n").is_err());
        assert!(ResponseParser::parse(b"* 1 FETCH (RFC822 {99}\r\nshort)\r\n").is_err());
        assert!(ResponseParser::parse(b"* 1 FETCH (UID 4\r\n").is_err());
    }

    proptest::proptest! {
        #[test]
        fn parse_never_panics(input in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let _ = ResponseParser::parse(&input);
        }

        #[test]
        fn parse_fetch_like_never_panics(tail in "[ -~{}()\\[\\]\r\n]{0,120}") {
            let input = format!("* 1 FETCH ({tail}");
            let _ = ResponseParser::parse(input.as_bytes());
        }
    }
}
