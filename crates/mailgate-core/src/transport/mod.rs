//! Mail Transport Client: SMTP submission through the service account.

mod message;

pub use message::{Attachment, AttachmentError, AttachmentSource, OutgoingMessage, SendReport};

use mailgate_mime::MessageBuilder;
use mailgate_smtp::connection::{SmtpStream, connect, connect_tls};
use mailgate_smtp::{Address, Client, Connected};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, GatewayConfig, Security};
use crate::deadline::within;

/// Name announced in EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

/// Errors that abort a send. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connecting, greeting, EHLO or TLS negotiation failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The service account was rejected or has no secret.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// An address was invalid or the server refused the message.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Submits `message` from the service account.
///
/// The attachment, if any, is read and encoded first. If that fails the
/// message goes out without it and the returned report says why.
///
/// # Errors
///
/// Returns [`TransportError`] naming the phase that failed. Each network
/// phase is bounded by `config.timeout`.
pub async fn send(
    config: &GatewayConfig,
    message: OutgoingMessage,
) -> Result<SendReport, TransportError> {
    let secret = config
        .service_account_secret
        .as_ref()
        .ok_or_else(|| TransportError::AuthFailed("no service account secret configured".to_string()))?;

    let from = Address::new(&config.service_account_address)
        .map_err(|e| TransportError::SendFailed(format!("service account address: {e}")))?;
    let to = Address::new(&message.recipient)
        .map_err(|e| TransportError::SendFailed(format!("recipient: {e}")))?;

    let (attachment, attachment_error) = match message.attachment {
        Some(attachment) => match load_attachment(&attachment).await {
            Ok(loaded) => (Some(loaded), None),
            Err(error) => {
                warn!(filename = %error.filename, reason = %error.reason, "sending without attachment");
                (None, Some(error))
            }
        },
        None => (None, None),
    };

    let mut builder = MessageBuilder::new()
        .from(from.as_str())
        .to(to.as_str())
        .subject(message.subject.as_str())
        .text_body(message.body_text.as_str());
    if let Some(attachment) = attachment {
        builder = builder.attach(attachment);
    }
    let raw = builder
        .build()
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;

    let limit = config.timeout;
    let endpoint = &config.submission;

    let client = within(limit, open(endpoint))
        .await
        .map_err(TransportError::ConnectFailed)?;

    let mechanism = client.server_info().preferred_auth();
    debug!(mechanism = mechanism.as_str(), "authenticating service account");
    let client = within(
        limit,
        client.authenticate(mechanism, from.as_str(), secret.expose()),
    )
    .await
    .map_err(TransportError::AuthFailed)?;

    let size = raw.len();
    let client = within(limit, async {
        let client = client.mail_from(from, Some(size)).await?;
        let client = client.rcpt_to(to).await?;
        let client = client.data().await?.send_message(&raw).await?;
        Ok::<_, mailgate_smtp::Error>(client)
    })
    .await
    .map_err(TransportError::SendFailed)?;

    // The message is already accepted; a failed QUIT does not undo that.
    if let Err(cause) = within(limit, client.quit()).await {
        warn!(%cause, "SMTP QUIT failed after delivery");
    }

    info!(
        recipient = %message.recipient,
        bytes = size,
        attachment_dropped = attachment_error.is_some(),
        "message sent"
    );
    Ok(SendReport { attachment_error })
}

/// Connects, reads the greeting, sends EHLO and applies the security mode.
async fn open(endpoint: &Endpoint) -> mailgate_smtp::Result<Client<Connected>> {
    debug!(%endpoint, "connecting to submission server");
    let stream: SmtpStream = match endpoint.security {
        Security::Tls => connect_tls(&endpoint.host, endpoint.port).await?,
        Security::StartTls | Security::None => connect(&endpoint.host, endpoint.port).await?,
    };

    let client = Client::from_stream(stream).await?.ehlo(CLIENT_HOSTNAME).await?;
    match endpoint.security {
        Security::StartTls => client.starttls(&endpoint.host, CLIENT_HOSTNAME).await,
        Security::Tls | Security::None => Ok(client),
    }
}

/// Reads the attachment on a blocking thread and checks its filename.
async fn load_attachment(attachment: &Attachment) -> Result<mailgate_mime::Attachment, AttachmentError> {
    let failed = |reason: String| AttachmentError {
        filename: attachment.filename.clone(),
        reason,
    };

    let source = std::sync::Arc::clone(&attachment.source);
    let data = tokio::task::spawn_blocking(move || source.read_bytes())
        .await
        .map_err(|e| failed(format!("reader task failed: {e}")))?
        .map_err(|e| failed(e.to_string()))?;

    mailgate_mime::Attachment::new(attachment.filename.as_str(), data).map_err(|e| failed(e.to_string()))
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
    use crate::config::Secret;
    use std::io;

    #[derive(Debug)]
    struct Unreadable;

    impl AttachmentSource for Unreadable {
        fn read_bytes(&self) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
        }
    }

    #[tokio::test]
    async fn test_load_attachment() {
        let ok = load_attachment(&Attachment::from_bytes("a.txt", b"abc".to_vec()))
            .await
            .unwrap();
        assert_eq!(ok.filename(), "a.txt");
        assert_eq!(ok.data(), b"abc");

        let err = load_attachment(&Attachment::new("b.txt", Unreadable))
            .await
            .unwrap_err();
        assert_eq!(err.filename, "b.txt");
        assert!(err.reason.contains("permission denied"));

        let err = load_attachment(&Attachment::from_bytes("bad\r\nname", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.filename, "bad\r\nname");
    }

    #[tokio::test]
    async fn test_missing_secret_fails_before_connecting() {
        let config = GatewayConfig {
            service_account_address: "relay@example.com".to_string(),
            ..GatewayConfig::default()
        };
        let err = send(&config, OutgoingMessage::new("a@example.com", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::AuthFailed("no service account secret configured".to_string())
        );
        assert_eq!(
            err.to_string(),
            "authentication failed: no service account secret configured"
        );
    }

    #[tokio::test]
    async fn test_bad_recipient_is_send_failure() {
        let config = GatewayConfig {
            service_account_address: "relay@example.com".to_string(),
            service_account_secret: Some(Secret::new("s")),
            ..GatewayConfig::default()
        };
        let err = send(&config, OutgoingMessage::new("not an address", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SendFailed(cause) if cause.starts_with("recipient")));
    }
}
