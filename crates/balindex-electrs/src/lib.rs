//! balindex-electrs — electrs/Esplora block source and index loop.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use balindex_electrs::{EsploraClient, IndexLoop, IndexerBuilder};
//! use balindex_storage::InMemoryStorage;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), balindex_core::IndexerError> {
//! let source = EsploraClient::default_for("http://localhost:3000")?;
//! let store = Arc::new(InMemoryStorage::new());
//! let config = IndexerBuilder::new().batch_size(10).build_config();
//!
//! let mut indexer = IndexLoop::new(config, source, store);
//! indexer.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod fetcher;
pub mod index_loop;

pub use builder::IndexerBuilder;
pub use fetcher::{EsploraClient, EsploraClientConfig};
pub use index_loop::{CycleOutcome, IndexLoop};
