//! Commands on a selected mailbox.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::command::{Command, FetchAttribute};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::SequenceSet;
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the sequence numbers of every message (`SEARCH ALL`), in the
    /// order the server lists them.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the search.
    pub async fn search_all(&mut self) -> Result<Vec<u32>> {
        let responses = self.execute(&Command::SearchAll).await?;
        Ok(responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Fetches data items for a sequence set.
    ///
    /// Returns `(sequence number, items)` pairs in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the fetch.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<(u32, Vec<FetchItem>)>> {
        let responses = self
            .execute(&Command::Fetch {
                sequence: sequence.clone(),
                items: items.to_vec(),
            })
            .await?;
        Ok(responses
            .into_iter()
            .filter_map(|r| match r {
                UntaggedResponse::Fetch { seq, items } => Some((seq, items)),
                _ => None,
            })
            .collect())
    }

    /// Fetches one full message (`FETCH n RFC822`).
    ///
    /// Returns `None` if the server answered without message content.
    ///
    /// # Errors
    ///
    /// Returns an error for sequence number 0 or if the server rejects the
    /// fetch.
    pub async fn fetch_rfc822(&mut self, seq: u32) -> Result<Option<Vec<u8>>> {
        let set = SequenceSet::single(seq)
            .ok_or_else(|| Error::InvalidState("sequence numbers start at 1".to_string()))?;
        let fetched = self.fetch(&set, &[FetchAttribute::Rfc822]).await?;

        Ok(fetched
            .into_iter()
            .filter(|(n, _)| *n == seq)
            .flat_map(|(_, items)| items)
            .find_map(|item| match item {
                FetchItem::Rfc822(data) => data,
                FetchItem::Body { section, data } if section.is_empty() => data,
                _ => None,
            }))
    }
}
