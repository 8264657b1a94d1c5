//! Submission against a scripted SMTP server.

#![allow(clippy::unwrap_used)]

mod common;

use std::io;

use mailgate_core::transport::send;
use mailgate_core::{Attachment, AttachmentSource, OutgoingMessage, TransportError};
use mailgate_mime::Message;

#[derive(Debug)]
struct Unreadable;

impl AttachmentSource for Unreadable {
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
    }
}

#[tokio::test]
async fn test_send_plain_message() {
    let (port, server) = common::smtp_server(true).await;
    let config = common::config(port, common::closed_port().await);

    let report = send(&config, OutgoingMessage::new("a@example.com", "Hi", "Hello"))
        .await
        .unwrap();
    assert!(report.is_complete());

    let session = server.await.unwrap();
    assert_eq!(session.messages.len(), 1);
    assert!(session.commands.iter().any(|c| c.starts_with("MAIL FROM:<relay@example.com>")));
    assert!(session.commands.contains(&"RCPT TO:<a@example.com>".to_string()));
    assert_eq!(session.commands.last().unwrap(), "QUIT");

    let message = Message::parse(session.messages[0].as_bytes()).unwrap();
    assert_eq!(message.headers.get("Subject"), Some("Hi"));
    assert_eq!(message.headers.get("To"), Some("a@example.com"));
    assert_eq!(message.parts.len(), 1);
    assert!(message.parts[0].content_type().unwrap().is_text_plain());
    assert_eq!(message.plain_text().unwrap().as_deref(), Some("Hello"));
}

#[tokio::test]
async fn test_send_with_attachment() {
    let (port, server) = common::smtp_server(true).await;
    let config = common::config(port, common::closed_port().await);

    let message = OutgoingMessage::new("a@example.com", "Report", "Attached.")
        .with_attachment(Attachment::from_bytes("q3.csv", b"a,b\n1,2\n".to_vec()));
    let report = send(&config, message).await.unwrap();
    assert!(report.is_complete());

    let session = server.await.unwrap();
    let message = Message::parse(session.messages[0].as_bytes()).unwrap();
    assert_eq!(message.parts.len(), 2);
    assert_eq!(message.parts[1].decode_body().unwrap(), b"a,b\n1,2\n");
    assert_eq!(message.plain_text().unwrap().as_deref(), Some("Attached."));
}

#[tokio::test]
async fn test_unreadable_attachment_still_sends_body() {
    let (port, server) = common::smtp_server(true).await;
    let config = common::config(port, common::closed_port().await);

    let message = OutgoingMessage::new("a@example.com", "Hi", "Hello")
        .with_attachment(Attachment::new("secret.pdf", Unreadable));
    let report = send(&config, message).await.unwrap();

    let error = report.attachment_error.unwrap();
    assert_eq!(error.filename, "secret.pdf");
    assert!(error.reason.contains("permission denied"));

    let session = server.await.unwrap();
    assert_eq!(session.messages.len(), 1);
    let message = Message::parse(session.messages[0].as_bytes()).unwrap();
    assert_eq!(message.parts.len(), 1);
    assert_eq!(message.plain_text().unwrap().as_deref(), Some("Hello"));
}

#[tokio::test]
async fn test_rejected_auth() {
    let (port, server) = common::smtp_server(false).await;
    let config = common::config(port, common::closed_port().await);

    let err = send(&config, OutgoingMessage::new("a@example.com", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::AuthFailed(ref cause) if cause.contains("535")));
    assert!(err.to_string().starts_with("authentication failed: "));

    let session = server.await.unwrap();
    assert!(session.messages.is_empty());
    assert!(!session.commands.iter().any(|c| c.starts_with("MAIL")));
}

#[tokio::test]
async fn test_refused_connection() {
    let config = common::config(common::closed_port().await, common::closed_port().await);

    let err = send(&config, OutgoingMessage::new("a@example.com", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::ConnectFailed(_)));
    assert!(err.to_string().starts_with("connection failed: "));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let config = common::config(common::silent_server().await, common::closed_port().await);

    let err = send(&config, OutgoingMessage::new("a@example.com", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::ConnectFailed("timed out after 500ms".to_string())
    );
}

#[tokio::test]
async fn test_invalid_recipient_never_connects() {
    let config = common::config(common::silent_server().await, common::closed_port().await);

    let err = send(&config, OutgoingMessage::new("not an address", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::SendFailed(ref cause) if cause.starts_with("recipient: ")));
}
