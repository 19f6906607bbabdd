//! Delta extraction — turns a transaction's inputs and outputs into
//! per-address signed balance changes.
//!
//! Only addressed value is tracked: outputs without a destination address,
//! and inputs whose previous output has none (or that have no previous
//! output at all, like coinbase inputs), are skipped.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::delta::{into_deltas, merge, sum_delta, AddressDelta};
use crate::types::Transaction;

impl Transaction {
    /// Per-address sums of everything this transaction pays out (`+value`).
    pub fn output_deltas(&self) -> Vec<AddressDelta> {
        let mut sums = BTreeMap::new();
        for out in &self.vout {
            if let Some(address) = &out.scriptpubkey_address {
                sum_delta(&mut sums, address, BigInt::from(out.value));
            }
        }
        into_deltas(sums)
    }

    /// Per-address sums of everything this transaction spends (`-value`).
    pub fn input_deltas(&self) -> Vec<AddressDelta> {
        let mut sums = BTreeMap::new();
        for input in &self.vin {
            let Some(prevout) = &input.prevout else {
                continue;
            };
            if let Some(address) = &prevout.scriptpubkey_address {
                sum_delta(&mut sums, address, -BigInt::from(prevout.value));
            }
        }
        into_deltas(sums)
    }

    /// All balance changes caused by this transaction, one per address.
    pub fn deltas(&self) -> Vec<AddressDelta> {
        extract(self)
    }
}

/// Extract the merged per-address deltas of one transaction.
pub fn extract(tx: &Transaction) -> Vec<AddressDelta> {
    merge(tx.output_deltas().into_iter().chain(tx.input_deltas()))
}

/// Extract and merge the deltas of every transaction in a block.
pub fn block_deltas(txs: &[Transaction]) -> Vec<AddressDelta> {
    merge(txs.iter().flat_map(extract))
}
