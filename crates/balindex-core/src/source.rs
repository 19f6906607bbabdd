//! The `BlockSource` trait — everything the index loop needs from the
//! upstream block explorer.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::Transaction;

/// Read-only access to chain data.
///
/// Every failure (transport, non-success status, undecodable body) surfaces
/// as [`IndexerError::Upstream`]; the index loop treats them all alike.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns `true` if the source currently answers requests.
    async fn is_connected(&self) -> bool;

    /// Height of the current chain tip.
    async fn tip_height(&self) -> Result<u64, IndexerError>;

    /// Hash of the block at `height`. Fails for unknown heights.
    async fn block_hash(&self, height: u64) -> Result<String, IndexerError>;

    /// All transactions of the block with the given hash.
    async fn block_transactions(&self, hash: &str) -> Result<Vec<Transaction>, IndexerError>;
}
