//! Mailbox selection.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{MailboxStatus, ResponseCode};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a mailbox read-write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`](crate::Error::No) if the mailbox does not exist.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let command = Command::Select {
            mailbox: mailbox.to_string(),
        };
        let responses = self.execute(&command).await?;
        let status = mailbox_status(mailbox, &responses);
        debug!(mailbox, exists = status.exists, "mailbox opened");
        Ok((self.into_state(), status))
    }
}

/// Folds SELECT data into a status.
pub(crate) fn mailbox_status(mailbox: &str, responses: &[UntaggedResponse]) -> MailboxStatus {
    let mut status = MailboxStatus {
        name: mailbox.to_string(),
        ..MailboxStatus::default()
    };

    for response in responses {
        match response {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Ok { code: Some(code), .. } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => status.uid_next = Some(*v),
                ResponseCode::ReadOnly => status.read_only = true,
                _ => {}
            },
            _ => {}
        }
    }

    status
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
    fn test_mailbox_status_from_select_data() {
        let responses = vec![
            UntaggedResponse::Flags(vec!["\\Seen".to_string()]),
            UntaggedResponse::Exists(12),
            UntaggedResponse::Recent(1),
            UntaggedResponse::Ok {
                code: Some(ResponseCode::UidValidity(3857529045)),
                text: "UIDs valid".to_string(),
            },
            UntaggedResponse::Ok {
                code: Some(ResponseCode::UidNext(4392)),
                text: "Predicted next UID".to_string(),
            },
        ];

        let status = mailbox_status("INBOX", &responses);
        assert_eq!(status.name, "INBOX");
        assert_eq!(status.exists, 12);
        assert_eq!(status.recent, 1);
        assert_eq!(status.uid_validity, Some(3857529045));
        assert_eq!(status.uid_next, Some(4392));
        assert!(!status.read_only);
    }

    #[test]
    fn test_mailbox_status_read_only_code() {
        let responses = vec![UntaggedResponse::Ok {
            code: Some(ResponseCode::ReadOnly),
            text: String::new(),
        }];
        assert!(mailbox_status("Archive", &responses).read_only);
    }
}
