//! Client flows against a scripted in-memory server.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailgate_imap::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use mailgate_imap::{Capability, Client, Error, FetchAttribute, SequenceSet};

/// Replays canned server output and records what the client writes.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap();
        let data = self.responses.get_ref();
        if pos < data.len() {
            let n = (data.len() - pos).min(buf.remaining());
            buf.put_slice(&data[pos..pos + n]);
            self.responses.set_position((pos + n) as u64);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] mock ready\r\n";

#[tokio::test]
async fn test_read_recent_messages_flow() {
    let script = [
        GREETING,
        b"A0001 OK [CAPABILITY IMAP4rev1 IDLE] LOGIN completed\r\n",
        b"* FLAGS (\\Seen \\Answered)\r\n",
        b"* 3 EXISTS\r\n",
        b"* 0 RECENT\r\n",
        b"* OK [UIDVALIDITY 7] UIDs valid\r\n",
        b"A0002 OK [READ-WRITE] SELECT completed\r\n",
        b"* SEARCH 1 2 3\r\n",
        b"A0003 OK SEARCH completed\r\n",
        b"* 3 FETCH (RFC822 {24}\r\nSubject: third\r\n\r\nbody\r\n)\r\n",
        b"A0004 OK FETCH completed\r\n",
        b"* BYE logging out\r\n",
        b"A0005 OK LOGOUT completed\r\n",
    ]
    .concat();
    let (stream, sent) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    assert!(client.has_capability(&Capability::Auth("PLAIN".to_string())));

    let client = client.login("relay@example.com", "app secret").await.unwrap();
    let (mut inbox, status) = client.select("INBOX").await.unwrap();
    assert_eq!(status.exists, 3);
    assert_eq!(status.uid_validity, Some(7));

    assert_eq!(inbox.search_all().await.unwrap(), vec![1, 2, 3]);
    let raw = inbox.fetch_rfc822(3).await.unwrap().unwrap();
    assert_eq!(raw, b"Subject: third\r\n\r\nbody\r\n");
    inbox.logout().await.unwrap();

    assert_eq!(
        sent_text(&sent),
        concat!(
            "A0001 LOGIN relay@example.com \"app secret\"\r\n",
            "A0002 SELECT INBOX\r\n",
            "A0003 SEARCH ALL\r\n",
            "A0004 FETCH 3 RFC822\r\n",
            "A0005 LOGOUT\r\n",
        )
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let script = [
        GREETING,
        b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n",
    ]
    .concat();
    let (stream, _) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let err = client.login("relay@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::No(text) if text == "Invalid credentials"));
}

#[tokio::test]
async fn test_login_disabled_is_refused_locally() {
    let (stream, sent) =
        MockStream::new(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n");

    let client = Client::from_stream(stream).await.unwrap();
    let err = client.login("user", "pass").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(sent_text(&sent).is_empty());
}

#[tokio::test]
async fn test_greeting_bye() {
    let (stream, _) = MockStream::new(b"* BYE too many connections\r\n");
    let err = Client::from_stream(stream).await.unwrap_err();
    assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
}

#[tokio::test]
async fn test_non_ascii_password_sent_as_literal() {
    let script = [
        GREETING,
        b"+ Ready for literal data\r\n",
        b"A0001 OK LOGIN completed\r\n",
    ]
    .concat();
    let (stream, sent) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    client.login("user", "pässword").await.unwrap();

    assert_eq!(
        sent_text(&sent),
        "A0001 LOGIN user {9}\r\npässword\r\n"
    );
}

#[tokio::test]
async fn test_literal_rejected_before_continuation() {
    let script = [GREETING, b"A0001 NO literal refused\r\n"].concat();
    let (stream, _) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let err = client.login("user", "pässword").await.unwrap_err();
    assert!(matches!(err, Error::No(_)));
}

#[tokio::test]
async fn test_select_missing_mailbox() {
    let script = [
        GREETING,
        b"A0001 OK LOGIN completed\r\n",
        b"A0002 NO Mailbox does not exist\r\n",
    ]
    .concat();
    let (stream, _) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let err = client.select("Nope").await.unwrap_err();
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_fetch_multiple_items_and_empty_search() {
    let script = [
        GREETING,
        b"A0001 OK LOGIN completed\r\n",
        b"* 2 EXISTS\r\n",
        b"A0002 OK [READ-ONLY] SELECT completed\r\n",
        b"* SEARCH\r\n",
        b"A0003 OK SEARCH completed\r\n",
        b"* 1 FETCH (UID 10 RFC822.SIZE 120)\r\n",
        b"* 2 FETCH (UID 11 RFC822.SIZE 99)\r\n",
        b"A0004 OK FETCH completed\r\n",
        b"A0005 OK LOGOUT completed\r\n",
    ]
    .concat();
    let (stream, sent) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let (mut mailbox, status) = client.select("Archive").await.unwrap();
    assert!(status.read_only);

    assert!(mailbox.search_all().await.unwrap().is_empty());

    let fetched = mailbox
        .fetch(
            &SequenceSet::range(1, 2).unwrap(),
            &[FetchAttribute::Uid, FetchAttribute::Rfc822Size],
        )
        .await
        .unwrap();
    assert_eq!(
        fetched,
        vec![
            (1, vec![FetchItem::Uid(10), FetchItem::Rfc822Size(120)]),
            (2, vec![FetchItem::Uid(11), FetchItem::Rfc822Size(99)]),
        ]
    );
    mailbox.logout().await.unwrap();

    assert!(sent_text(&sent).contains("A0004 FETCH 1:2 (UID RFC822.SIZE)\r\n"));
}

#[tokio::test]
async fn test_fetch_without_content() {
    let script = [
        GREETING,
        b"A0001 OK LOGIN completed\r\n",
        b"A0002 OK SELECT completed\r\n",
        b"A0003 OK FETCH completed\r\n",
    ]
    .concat();
    let (stream, _) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let (mut inbox, _) = client.select("INBOX").await.unwrap();
    assert_eq!(inbox.fetch_rfc822(9).await.unwrap(), None);
    assert!(matches!(
        inbox.fetch_rfc822(0).await.unwrap_err(),
        Error::InvalidState(_)
    ));
}

#[tokio::test]
async fn test_connection_drop_mid_command() {
    let script = [GREETING, b"A0001 OK LOGIN completed\r\n", b"* 3 EXI"].concat();
    let (stream, _) = MockStream::new(&script);

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let err = client.select("INBOX").await.unwrap_err();
    assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
}

#[test]
fn test_parser_public_api() {
    let parsed = ResponseParser::parse(b"* CAPABILITY IMAP4rev1 STARTTLS\r\n").unwrap();
    assert_eq!(
        parsed,
        Response::Untagged(UntaggedResponse::Capability(vec![
            Capability::Imap4Rev1,
            Capability::StartTls
        ]))
    );
}
