//! Per-phase time limits for network operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Runs `future` for at most `limit`.
///
/// Errors and timeouts are both flattened to a cause string, which callers
/// wrap in the error of the phase being run.
pub(crate) async fn within<T, E, F>(limit: Duration, future: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!("timed out after {limit:?}")),
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
    async fn test_passes_through_value_and_error() {
        let ok = within(Duration::from_secs(1), async { Ok::<_, String>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = within(Duration::from_secs(1), async { Err::<u8, _>("refused") }).await;
        assert_eq!(err, Err("refused".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_message() {
        let result = within(Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await;
        assert_eq!(result, Err("timed out after 30s".to_string()));
    }
}
