//! Fluent builder API for creating balance indexers.
//!
//! # Example
//!
//! ```rust,no_run
//! use balindex_electrs::IndexerBuilder;
//!
//! let config = IndexerBuilder::new()
//!     .batch_size(25)
//!     .retry_delay_ms(2_000)
//!     .build_config();
//! ```

use balindex_core::indexer::IndexerConfig;

/// Fluent builder for `IndexerConfig`.
#[derive(Default)]
pub struct IndexerBuilder {
    config: IndexerConfig,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexerConfig::default(),
        }
    }

    /// Set the number of blocks fetched and persisted together.
    pub fn batch_size(mut self, size: u64) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the fixed wait after a failure or when caught up, in milliseconds.
    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    /// Build the `IndexerConfig`.
    pub fn build_config(self) -> IndexerConfig {
        self.config
    }
}
