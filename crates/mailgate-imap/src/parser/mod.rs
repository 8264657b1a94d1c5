//! IMAP response parser.
//!
//! Works on one complete response as framed by
//! [`FramedStream`](crate::connection::FramedStream): the response line with
//! any literal data embedded after its `{n}` marker.
//!
//! ```
//! use mailgate_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(3)));
//! ```

mod lexer;
mod response;

pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
