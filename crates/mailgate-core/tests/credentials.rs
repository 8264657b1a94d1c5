//! Credential store persistence on disk.

#![allow(clippy::unwrap_used)]

use mailgate_core::credentials::{CredentialStore, PasswordVerifier, StoreError};

fn temp_db(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("mailgate-{name}-{}.db", std::process::id()))
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let path = temp_db("reopen");
    let _ = std::fs::remove_file(&path);
    let path_str = path.to_string_lossy().into_owned();

    {
        let store = CredentialStore::new(&path_str).await.unwrap();
        let verifier = PasswordVerifier::hash("hunter2").unwrap();
        store.register("alice", &verifier).await.unwrap();
    }

    let store = CredentialStore::new(&path_str).await.unwrap();
    let record = store.find_by_username("alice").await.unwrap().unwrap();
    assert!(record.verifies("hunter2").await.unwrap());
    assert!(!record.verifies("hunter3").await.unwrap());
    assert!(matches!(
        store.register("alice", "x").await.unwrap_err(),
        StoreError::AlreadyExists(_)
    ));

    drop(store);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_verifier_is_not_the_password() {
    let store = CredentialStore::in_memory().await.unwrap();
    let verifier = PasswordVerifier::hash("hunter2").unwrap();
    let record = store.register("alice", &verifier).await.unwrap();

    assert!(!record.password_verifier.contains("hunter2"));
    assert!(record.password_verifier.starts_with("$argon2"));
    assert!(!format!("{record:?}").contains(&record.password_verifier));
}
