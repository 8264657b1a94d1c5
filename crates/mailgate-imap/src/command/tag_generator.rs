//! Command tags.

/// Sequential tag source: `A0001`, `A0002`, ...
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    counter: u32,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix, counter: 0 }
    }

    /// Returns the next tag. The counter wraps after `u32::MAX`.
    pub fn next_tag(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, self.counter)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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
    fn test_sequential_unique_tags() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.next_tag(), "A0002");

        let mut custom = TagGenerator::new('M');
        assert_eq!(custom.next_tag(), "M0001");
    }

    #[test]
    fn test_width_grows_past_four_digits() {
        let mut tags = TagGenerator {
            prefix: 'A',
            counter: 9999,
        };
        assert_eq!(tags.next_tag(), "A10000");
    }
}
