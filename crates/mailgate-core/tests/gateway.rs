//! Gateway facade: accounts and end-to-end relay.

#![allow(clippy::unwrap_used)]

mod common;

use std::num::NonZeroUsize;

use mailgate_core::{CredentialStore, Gateway, GatewayConfig, GatewayError, OutgoingMessage};

async fn gateway(config: GatewayConfig) -> Gateway {
    Gateway::with_store(config, CredentialStore::in_memory().await.unwrap())
}

#[tokio::test]
async fn test_register_twice_keeps_one_record() {
    let store = CredentialStore::in_memory().await.unwrap();
    let gateway = Gateway::with_store(GatewayConfig::default(), store.clone());

    gateway.register("alice", "first").await.unwrap();
    let err = gateway.register("alice", "second").await.unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyExists(ref u) if u == "alice"));

    assert_eq!(store.count().await.unwrap(), 1);
    assert!(gateway.login("alice", "first").await.is_ok());
    assert!(gateway.login("alice", "second").await.is_err());
}

#[tokio::test]
async fn test_login_requires_exact_credentials() {
    let gateway = gateway(GatewayConfig::default()).await;
    gateway.register("alice", "pw-a").await.unwrap();
    gateway.register("bob", "pw-b").await.unwrap();

    assert_eq!(gateway.login("alice", "pw-a").await.unwrap().username(), "alice");
    assert_eq!(gateway.login("bob", "pw-b").await.unwrap().username(), "bob");

    for (user, pass) in [("alice", "pw-b"), ("carol", "pw-a"), ("Bob", "pw-b"), ("", "")] {
        assert!(matches!(
            gateway.login(user, pass).await.unwrap_err(),
            GatewayError::AuthFailure
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_single_winner() {
    const CALLERS: usize = 8;
    let path = std::env::temp_dir().join(format!(
        "mailgate-race-{}-{}.db",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let config = GatewayConfig {
        database_path: path.clone(),
        ..GatewayConfig::default()
    };
    let gateway = Gateway::open(config).await.unwrap();

    let tasks: Vec<_> = (0..CALLERS)
        .map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.register("shared", &format!("pw{i}")).await })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(GatewayError::AlreadyExists(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(duplicates, CALLERS - 1);

    drop(gateway);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_session_relays_send_and_fetch() {
    let (smtp_port, smtp) = common::smtp_server(true).await;
    let (imap_port, _imap) = common::imap_server(vec![common::plain_message(
        "bob@example.com",
        "Re: Hi",
        "Hello back",
    )])
    .await;
    let gateway = gateway(common::config(smtp_port, imap_port)).await;

    gateway.register("alice", "pw").await.unwrap();
    let session = gateway.login("alice", "pw").await.unwrap();

    let report = gateway
        .send(&session, OutgoingMessage::new("bob@example.com", "Hi", "Hello"))
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(smtp.await.unwrap().messages.len(), 1);

    let results = gateway
        .fetch_recent(&session, NonZeroUsize::new(5).unwrap())
        .await
        .unwrap();
    let summary = results[0].as_ref().unwrap();
    assert_eq!(summary.from, "bob@example.com");
    assert_eq!(summary.subject, "Re: Hi");
    assert_eq!(summary.body_text, "Hello back");
}

#[tokio::test]
async fn test_relay_errors_keep_layer() {
    let gateway = gateway(common::config(
        common::closed_port().await,
        common::closed_port().await,
    ))
    .await;
    gateway.register("alice", "pw").await.unwrap();
    let session = gateway.login("alice", "pw").await.unwrap();

    let err = gateway
        .send(&session, OutgoingMessage::new("bob@example.com", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    assert!(err.to_string().starts_with("connection failed: "));

    let err = gateway
        .fetch_recent(&session, NonZeroUsize::MIN)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Retrieval(_)));
}
