//! Indexer cursor — the height of the last fully-applied block, and the
//! selection of the next batch window from it.

use serde::{Deserialize, Serialize};

/// The indexer's persisted position in the chain.
///
/// Height 0 means no block has been applied yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub last_height: u64,
}

impl Cursor {
    pub fn new(last_height: u64) -> Self {
        Self { last_height }
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.last_height + 1
    }

    /// The next contiguous batch `[last + 1, min(last + batch_size, tip)]`,
    /// or `None` when the cursor has caught up with `tip`.
    pub fn next_batch(&self, tip: u64, batch_size: u64) -> Option<BatchRange> {
        if self.last_height >= tip || batch_size == 0 {
            return None;
        }
        let start = self.next_block();
        let end = self.last_height.saturating_add(batch_size).min(tip);
        Some(BatchRange { start, end })
    }
}

/// An inclusive, non-empty range of block heights processed as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRange {
    pub start: u64,
    pub end: u64,
}

impl BatchRange {
    pub fn heights(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for BatchRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
