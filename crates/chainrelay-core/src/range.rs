//! Block ranges and the scan cursor.
//!
//! Ranges are inclusive on both ends. A range starting at `from` ends at
//! `min(from + max_range - 1, head)`, so no range spans more than
//! `max_range` blocks and consecutive ranges never overlap.

use serde::{Deserialize, Serialize};

/// An inclusive block interval `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        debug_assert!(from <= to, "empty block range {from}..={to}");
        Self { from, to }
    }

    /// Number of blocks covered by the range.
    pub fn span(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Returns `true` if `block` lies inside the range.
    pub fn contains(&self, block: u64) -> bool {
        self.from <= block && block <= self.to
    }

    /// Returns `true` if `next` starts right after `self` ends.
    pub fn is_followed_by(&self, next: &BlockRange) -> bool {
        next.from == self.to + 1
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// The scanner's position: the last block whose events have been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Last processed block number.
    pub block_number: u64,
}

impl Cursor {
    /// Create a cursor positioned at the given checkpoint.
    pub fn new(block_number: u64) -> Self {
        Self { block_number }
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.block_number + 1
    }

    /// Returns `true` once the cursor has caught up with `head`.
    pub fn reached(&self, head: u64) -> bool {
        self.block_number >= head
    }

    /// The next range to query, or `None` if the cursor is at or past `head`.
    pub fn next_range(&self, head: u64, max_range: u64) -> Option<BlockRange> {
        if self.reached(head) || max_range == 0 {
            return None;
        }
        let from = self.next_block();
        let to = from.saturating_add(max_range - 1).min(head);
        Some(BlockRange::new(from, to))
    }

    /// Advance the cursor to the end of a successfully processed range.
    pub fn advance(&mut self, range: &BlockRange) {
        self.block_number = range.to;
    }
}

/// Partition `[checkpoint + 1, head]` into at most `max_ranges` ranges.
///
/// This is the exact sequence the scanner walks when every query succeeds.
pub fn plan(checkpoint: u64, head: u64, max_range: u64, max_ranges: u32) -> Vec<BlockRange> {
    let mut cursor = Cursor::new(checkpoint);
    let mut ranges = Vec::new();
    while ranges.len() < max_ranges as usize {
        match cursor.next_range(head, max_range) {
            Some(range) => {
                cursor.advance(&range);
                ranges.push(range);
            }
            None => break,
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_next_block() {
        let cursor = Cursor::new(500);
        assert_eq!(cursor.next_block(), 501);
    }

    #[test]
    fn next_range_is_clamped_to_head() {
        let cursor = Cursor::new(100);
        assert_eq!(cursor.next_range(105, 100), Some(BlockRange::new(101, 105)));
    }

    #[test]
    fn next_range_spans_at_most_max_range() {
        let cursor = Cursor::new(0);
        let range = cursor.next_range(5000, 100).unwrap();
        assert_eq!(range, BlockRange::new(1, 100));
        assert_eq!(range.span(), 100);
    }

    #[test]
    fn no_range_once_head_reached() {
        assert_eq!(Cursor::new(600).next_range(600, 100), None);
        assert_eq!(Cursor::new(700).next_range(600, 100), None);
    }

    #[test]
    fn plan_stops_at_head() {
        let ranges = plan(0, 250, 100, 9);
        assert_eq!(
            ranges,
            vec![
                BlockRange::new(1, 100),
                BlockRange::new(101, 200),
                BlockRange::new(201, 250),
            ]
        );
    }

    #[test]
    fn plan_stops_at_budget() {
        let ranges = plan(0, 5000, 100, 9);
        assert_eq!(ranges.len(), 9);
        assert_eq!(ranges.first().unwrap().from, 1);
        assert_eq!(ranges.last().unwrap().to, 900);
    }

    #[test]
    fn plan_is_contiguous() {
        let ranges = plan(17, 1234, 37, 100);
        assert_eq!(ranges[0].from, 18);
        for pair in ranges.windows(2) {
            assert!(pair[0].is_followed_by(&pair[1]));
        }
        assert!(ranges.iter().all(|r| r.span() <= 37));
        assert_eq!(ranges.last().unwrap().to, 1234);
    }

    #[test]
    fn single_block_ranges() {
        let ranges = plan(10, 13, 1, 9);
        assert_eq!(ranges.len(), 3);
        assert!(ranges.iter().all(|r| r.from == r.to));
    }
}
