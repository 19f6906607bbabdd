//! balindex-core — foundation for the address-balance indexer.
//!
//! # Architecture
//!
//! ```text
//! IndexLoop (balindex-electrs)
//!     ├── BlockSource      (tip, block hash, block transactions)
//!     ├── extract / merge  (per tx → per block → per batch)
//!     ├── BalanceStore     (balances + cursor, one transaction per batch)
//!     └── ProgressTracker  (rolling batch timings, ETA)
//! ```

pub mod cursor;
pub mod delta;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod source;
pub mod store;
pub mod tracker;
pub mod types;

pub use cursor::{BatchRange, Cursor};
pub use delta::{merge, AddressDelta};
pub use error::IndexerError;
pub use extract::{block_deltas, extract};
pub use indexer::{IndexerConfig, IndexerState};
pub use source::BlockSource;
pub use store::BalanceStore;
pub use tracker::ProgressTracker;
pub use types::{BalanceRecord, Transaction, TxInput, TxOutput, TxStatus};

pub use num_bigint::BigInt;
