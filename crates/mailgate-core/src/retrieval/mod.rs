//! Mail Retrieval Client: reads the most recent inbox messages.

mod summary;

pub use summary::{DecodeError, InboundMessageSummary};

use std::num::NonZeroUsize;

use mailgate_imap::{Client, ImapStream, NotAuthenticated, connect_plain, connect_tls};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, GatewayConfig, Security};
use crate::deadline::within;
use summary::summarize;

/// Mailbox that is read.
const INBOX: &str = "INBOX";

/// One slot per fetched message, in server listing order.
pub type FetchResults = Vec<Result<InboundMessageSummary, DecodeError>>;

/// Errors that abort a fetch. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// Connecting, greeting or TLS negotiation failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// LOGIN was rejected or no secret is configured.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// SELECT, SEARCH or FETCH failed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),
}

/// Fetches the last `count` messages of the service account's inbox.
///
/// Messages are returned oldest first, in the server's listing order. A
/// message that fails to decode fills its slot with a [`DecodeError`].
///
/// # Errors
///
/// Returns [`RetrievalError`] naming the phase that failed. Each network
/// phase, and each FETCH, is bounded by `config.timeout`.
pub async fn fetch_recent(
    config: &GatewayConfig,
    count: NonZeroUsize,
) -> Result<FetchResults, RetrievalError> {
    let secret = config
        .service_account_secret
        .as_ref()
        .ok_or_else(|| RetrievalError::AuthFailed("no service account secret configured".to_string()))?;
    let limit = config.timeout;

    let client = within(limit, open(&config.retrieval))
        .await
        .map_err(RetrievalError::ConnectFailed)?;

    debug!("logging in service account");
    let client = within(
        limit,
        client.login(&config.service_account_address, secret.expose()),
    )
    .await
    .map_err(RetrievalError::AuthFailed)?;

    let (mut inbox, status) = within(limit, client.select(INBOX))
        .await
        .map_err(RetrievalError::FetchFailed)?;
    let ids = within(limit, inbox.search_all())
        .await
        .map_err(RetrievalError::FetchFailed)?;
    debug!(exists = status.exists, listed = ids.len(), "inbox searched");

    let window = &ids[ids.len().saturating_sub(count.get())..];
    let mut results = Vec::with_capacity(window.len());
    for &seq in window {
        let raw = within(limit, inbox.fetch_rfc822(seq))
            .await
            .map_err(RetrievalError::FetchFailed)?;

        let slot = raw
            .ok_or_else(|| DecodeError::new(seq, "server returned no message content"))
            .and_then(|raw| summarize(seq, &raw));
        if let Err(e) = &slot {
            warn!(seq, reason = %e.reason, "message could not be decoded");
        }
        results.push(slot);
    }

    if let Err(cause) = within(limit, inbox.logout()).await {
        warn!(%cause, "IMAP LOGOUT failed");
    }

    info!(
        requested = count.get(),
        returned = results.len(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "inbox fetched"
    );
    Ok(results)
}

/// Connects, reads the greeting and applies the security mode.
async fn open(endpoint: &Endpoint) -> mailgate_imap::Result<Client<ImapStream, NotAuthenticated>> {
    debug!(%endpoint, "connecting to retrieval server");
    let stream = match endpoint.security {
        Security::Tls => connect_tls(&endpoint.host, endpoint.port).await?,
        Security::StartTls | Security::None => connect_plain(&endpoint.host, endpoint.port).await?,
    };

    let client = Client::from_stream(stream).await?;
    match endpoint.security {
        Security::StartTls => client.starttls(&endpoint.host).await,
        Security::Tls | Security::None => Ok(client),
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

    #[tokio::test]
    async fn test_missing_secret_fails_before_connecting() {
        let err = fetch_recent(&GatewayConfig::default(), NonZeroUsize::new(5).unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RetrievalError::AuthFailed("no service account secret configured".to_string())
        );
    }

    #[test]
    fn test_error_prefixes() {
        assert_eq!(
            RetrievalError::ConnectFailed("refused".to_string()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(
            RetrievalError::FetchFailed("NO".to_string()).to_string(),
            "fetch failed: NO"
        );
    }
}
