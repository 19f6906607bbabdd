//! The main index loop — drives continuous, resumable consumption of blocks.
//!
//! # Cycle
//! 1. DISCONNECTED: probe the source until it answers.
//! 2. FETCHING_TIP: read the cursor `H` from the store, ask the source for its tip `T`.
//! 3. SELECTING_BATCH: next range is `[H+1, min(H+batch_size, T)]`; nothing to do if `H >= T`.
//! 4. PROCESSING_BATCH: fetch every block of the range concurrently, extract and
//!    merge per block, then merge the blocks into one delta set.
//! 5. PERSISTING: apply the delta set and move the cursor in one transaction.
//!
//! Any failure waits `retry_delay` and starts over from the probe. Nothing is
//! persisted before step 5, so a failed batch is retried from the same cursor.
//! Shutdown is observed between cycles and during waits, never mid-batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use balindex_core::cursor::{BatchRange, Cursor};
use balindex_core::delta::{merge, AddressDelta};
use balindex_core::error::IndexerError;
use balindex_core::extract::block_deltas;
use balindex_core::indexer::{IndexerConfig, IndexerState};
use balindex_core::source::BlockSource;
use balindex_core::store::BalanceStore;
use balindex_core::tracker::ProgressTracker;

/// Result of one successful pass through the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was applied and the cursor moved to `batch.end`.
    Applied {
        batch: BatchRange,
        tip: u64,
        addresses: usize,
        elapsed: Duration,
    },
    /// The cursor is already at (or past) the tip.
    CaughtUp { height: u64, tip: u64 },
}

/// The core index loop implementation.
pub struct IndexLoop<C: BlockSource> {
    config: IndexerConfig,
    source: C,
    store: Arc<dyn BalanceStore>,
    progress: ProgressTracker,
    state: IndexerState,
}

impl<C: BlockSource> IndexLoop<C> {
    pub fn new(config: IndexerConfig, source: C, store: Arc<dyn BalanceStore>) -> Self {
        Self {
            config,
            source,
            store,
            progress: ProgressTracker::default(),
            state: IndexerState::Disconnected,
        }
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Run until `shutdown` is cancelled. Errors never end the loop.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(
            batch_size = self.config.batch_size,
            retry_delay_ms = self.config.retry_delay_ms,
            "Starting continuous indexing"
        );

        let mut connected = false;
        while !shutdown.is_cancelled() {
            if !connected {
                self.state = IndexerState::Disconnected;
                if self.source.is_connected().await {
                    tracing::info!("Block source reachable");
                    connected = true;
                } else {
                    tracing::warn!(
                        retry_delay_ms = self.config.retry_delay_ms,
                        "Block source not available. Waiting..."
                    );
                    self.wait(&shutdown).await;
                    continue;
                }
            }

            match self.run_cycle().await {
                Ok(CycleOutcome::Applied { .. }) => {}
                Ok(CycleOutcome::CaughtUp { height, tip }) => {
                    tracing::debug!(height, tip, "No new blocks");
                    self.state = IndexerState::IdleWait;
                    self.wait(&shutdown).await;
                }
                Err(e) => {
                    tracing::error!(
                        stage = %self.state,
                        error = %e,
                        transient = e.is_transient(),
                        retry_delay_ms = self.config.retry_delay_ms,
                        "Indexing cycle failed, retrying"
                    );
                    self.wait(&shutdown).await;
                    connected = false;
                }
            }
        }

        self.state = IndexerState::Stopped;
        tracing::info!("Indexing stopped");
    }

    /// Perform one fetch → select → process → persist pass.
    ///
    /// On error nothing has been persisted; `state()` tells which stage
    /// failed.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, IndexerError> {
        self.state = IndexerState::FetchingTip;
        let last_height = self.store.last_height().await?;
        let tip = self.source.tip_height().await?;

        self.state = IndexerState::SelectingBatch;
        let Some(batch) = Cursor::new(last_height).next_batch(tip, self.config.batch_size) else {
            return Ok(CycleOutcome::CaughtUp {
                height: last_height,
                tip,
            });
        };

        self.state = IndexerState::ProcessingBatch;
        let started = Instant::now();
        let deltas = self.process_batch(batch).await?;

        self.state = IndexerState::Persisting;
        self.store.apply_deltas(&deltas, batch.end).await?;

        let elapsed = started.elapsed();
        self.progress.record_batch(elapsed);
        self.log_progress(batch, tip, elapsed);

        Ok(CycleOutcome::Applied {
            batch,
            tip,
            addresses: deltas.len(),
            elapsed,
        })
    }

    /// Fetch all blocks of `batch` concurrently and merge their deltas.
    /// The first failure discards the whole batch.
    async fn process_batch(&self, batch: BatchRange) -> Result<Vec<AddressDelta>, IndexerError> {
        let per_block = try_join_all(batch.heights().map(|h| self.process_block(h))).await?;
        Ok(merge(per_block.into_iter().flatten()))
    }

    async fn process_block(&self, height: u64) -> Result<Vec<AddressDelta>, IndexerError> {
        let hash = self.source.block_hash(height).await?;
        let txs = self.source.block_transactions(&hash).await?;
        tracing::trace!(height, hash = %hash, txs = txs.len(), "block fetched");
        Ok(block_deltas(&txs))
    }

    fn log_progress(&self, batch: BatchRange, tip: u64, elapsed: Duration) {
        let percent = if tip == 0 {
            100.0
        } else {
            batch.end as f64 / tip as f64 * 100.0
        };
        let remaining = tip.saturating_sub(batch.end).div_ceil(self.config.batch_size.max(1));

        tracing::info!(
            batch_end = batch.end,
            tip,
            percent = %format!("{percent:.2}"),
            batch_ms = elapsed.as_millis() as u64,
            avg_ms = self.progress.average_batch_time().as_millis() as u64,
            elapsed = %self.progress.elapsed(),
            eta = %self.progress.eta(remaining),
            "Progress"
        );
    }

    /// Sleep for the retry delay unless shutdown comes first.
    async fn wait(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.config.retry_delay()) => {}
        }
    }
}
