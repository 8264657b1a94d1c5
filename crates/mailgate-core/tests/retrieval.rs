//! Inbox reads against a scripted IMAP server.

#![allow(clippy::unwrap_used)]

mod common;

use std::num::NonZeroUsize;

use mailgate_core::retrieval::fetch_recent;
use mailgate_core::{GatewayConfig, RetrievalError, Secret};

fn inbox(count: usize) -> Vec<Vec<u8>> {
    (1..=count)
        .map(|n| common::plain_message(&format!("sender{n}@example.com"), &format!("Message {n}"), &format!("body {n}")))
        .collect()
}

fn five() -> NonZeroUsize {
    NonZeroUsize::new(5).unwrap()
}

#[tokio::test]
async fn test_fewer_messages_than_requested() {
    let (port, server) = common::imap_server(inbox(3)).await;
    let config = common::config(common::closed_port().await, port);

    let results = fetch_recent(&config, five()).await.unwrap();
    let subjects: Vec<String> = results.into_iter().map(|r| r.unwrap().subject).collect();
    assert_eq!(subjects, ["Message 1", "Message 2", "Message 3"]);

    let received = server.await.unwrap();
    assert_eq!(received[0], "A0001 LOGIN relay@example.com s3cret");
    assert_eq!(received[1], "A0002 SELECT INBOX");
    assert_eq!(received[2], "A0003 SEARCH ALL");
    assert_eq!(received.last().unwrap(), "A0007 LOGOUT");
}

#[tokio::test]
async fn test_only_last_messages_fetched() {
    let (port, server) = common::imap_server(inbox(8)).await;
    let config = common::config(common::closed_port().await, port);

    let results = fetch_recent(&config, five()).await.unwrap();
    assert_eq!(results.len(), 5);

    let summaries: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(summaries.iter().map(|s| s.seq).collect::<Vec<_>>(), [4, 5, 6, 7, 8]);
    assert_eq!(summaries[0].from, "sender4@example.com");
    assert_eq!(summaries[4].body_text, "body 8");

    let received = server.await.unwrap();
    let fetches: Vec<_> = received.iter().filter(|l| l.contains(" FETCH ")).collect();
    assert_eq!(fetches.len(), 5);
    assert!(fetches[0].ends_with("FETCH 4 RFC822"));
}

#[tokio::test]
async fn test_empty_inbox() {
    let (port, _server) = common::imap_server(Vec::new()).await;
    let config = common::config(common::closed_port().await, port);

    let results = fetch_recent(&config, five()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_undecodable_message_keeps_neighbours() {
    let mut messages = inbox(3);
    messages[1] = b"Subject: broken\r\nContent-Transfer-Encoding: base64\r\n\r\n%%%%".to_vec();
    let (port, _server) = common::imap_server(messages).await;
    let config = common::config(common::closed_port().await, port);

    let results = fetch_recent(&config, five()).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().subject, "Message 1");
    assert_eq!(results[1].as_ref().unwrap_err().seq, 2);
    assert_eq!(results[2].as_ref().unwrap().subject, "Message 3");
}

#[tokio::test]
async fn test_login_rejected() {
    let (port, _server) = common::imap_server(inbox(1)).await;
    let config = GatewayConfig {
        service_account_secret: Some(Secret::new("wrong")),
        ..common::config(common::closed_port().await, port)
    };

    let err = fetch_recent(&config, five()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::AuthFailed(ref cause) if cause.contains("invalid credentials")));
}

#[tokio::test]
async fn test_missing_secret() {
    let config = GatewayConfig {
        service_account_secret: None,
        ..common::config(common::closed_port().await, common::closed_port().await)
    };

    let err = fetch_recent(&config, five()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::AuthFailed(_)));
}

#[tokio::test]
async fn test_refused_and_silent_servers() {
    let config = common::config(common::closed_port().await, common::closed_port().await);
    let err = fetch_recent(&config, five()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::ConnectFailed(_)));

    let config = common::config(common::closed_port().await, common::silent_server().await);
    let err = fetch_recent(&config, five()).await.unwrap_err();
    assert_eq!(
        err,
        RetrievalError::ConnectFailed("timed out after 500ms".to_string())
    );
}
