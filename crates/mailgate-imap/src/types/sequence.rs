//! Message sequence sets.

use std::fmt;

/// A non-empty set of message sequence numbers, written as `1,3:5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet(Vec<(u32, u32)>);

impl SequenceSet {
    /// A single message.
    ///
    /// Returns `None` for 0, which is not a valid sequence number.
    #[must_use]
    pub fn single(seq: u32) -> Option<Self> {
        (seq > 0).then(|| Self(vec![(seq, seq)]))
    }

    /// An inclusive range.
    ///
    /// Returns `None` if either end is 0.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        (start > 0 && end > 0).then(|| Self(vec![(start.min(end), start.max(end))]))
    }

    /// Every number in `seqs`, collapsed into ranges.
    ///
    /// Returns `None` if `seqs` is empty or contains 0.
    #[must_use]
    pub fn from_numbers(seqs: &[u32]) -> Option<Self> {
        if seqs.is_empty() || seqs.contains(&0) {
            return None;
        }

        let mut sorted = seqs.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for n in sorted {
            match ranges.last_mut() {
                Some((_, end)) if end.checked_add(1) == Some(n) => *end = n,
                _ => ranges.push((n, n)),
            }
        }
        Some(Self(ranges))
    }
}

impl fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (start, end)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
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

    #[test]
    fn test_display() {
        assert_eq!(SequenceSet::single(7).unwrap().to_string(), "7");
        assert_eq!(SequenceSet::range(10, 1).unwrap().to_string(), "1:10");
        assert_eq!(
            SequenceSet::from_numbers(&[5, 1, 2, 3, 9, 9]).unwrap().to_string(),
            "1:3,5,9"
        );
    }

    #[test]
    fn test_zero_rejected() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 4).is_none());
        assert!(SequenceSet::from_numbers(&[]).is_none());
        assert!(SequenceSet::from_numbers(&[1, 0]).is_none());
    }
}
