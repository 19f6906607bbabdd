//! Error types for the balindex pipeline.

use thiserror::Error;

/// Errors that can occur during indexing.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The block-data source was unreachable or answered with an error.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The balance store failed to read or commit.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid startup configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value could not be interpreted (e.g. a non-numeric balance string).
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl IndexerError {
    /// Returns `true` if the index loop should retry after a delay.
    ///
    /// Only configuration errors are fatal; they are raised at startup,
    /// never from inside the loop.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
