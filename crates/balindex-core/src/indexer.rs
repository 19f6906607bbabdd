//! Indexer configuration and state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an indexer instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// How many consecutive blocks are fetched and persisted as one unit.
    pub batch_size: u64,
    /// Fixed wait after any failure, and between polls once caught up.
    pub retry_delay_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_delay_ms: 5_000,
        }
    }
}

impl IndexerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Runtime state of the index loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerState {
    /// Waiting for the block source to answer a probe.
    Disconnected,
    /// Reading the cursor and asking the source for its tip.
    FetchingTip,
    /// Choosing the next height range.
    SelectingBatch,
    /// Fetching and extracting every block of the batch.
    ProcessingBatch,
    /// Committing the batch deltas and the new cursor.
    Persisting,
    /// Caught up with the tip; waiting for new blocks.
    IdleWait,
    /// Shut down.
    Stopped,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::FetchingTip => write!(f, "fetching-tip"),
            Self::SelectingBatch => write!(f, "selecting-batch"),
            Self::ProcessingBatch => write!(f, "processing-batch"),
            Self::Persisting => write!(f, "persisting"),
            Self::IdleWait => write!(f, "idle-wait"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
