//! Balance deltas and the merge that collapses them per address.
//!
//! Merging is associative and commutative: merging per transaction, then per
//! block, then per batch yields the same set as merging the flattened list in
//! one go. The index loop relies on this to fetch blocks concurrently and
//! persist a single consolidated set per batch.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A signed balance change for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDelta {
    pub address: String,
    pub delta: BigInt,
}

impl AddressDelta {
    pub fn new(address: impl Into<String>, delta: impl Into<BigInt>) -> Self {
        Self {
            address: address.into(),
            delta: delta.into(),
        }
    }
}

/// Add `value` to the running sum kept for `address`.
pub fn sum_delta(sums: &mut BTreeMap<String, BigInt>, address: &str, value: BigInt) {
    match sums.get_mut(address) {
        Some(acc) => *acc += value,
        None => {
            sums.insert(address.to_string(), value);
        }
    }
}

/// Collapse `deltas` into at most one entry per address, ordered by address.
///
/// Entries that sum to zero are kept; the store treats them as no-ops.
pub fn merge<I>(deltas: I) -> Vec<AddressDelta>
where
    I: IntoIterator<Item = AddressDelta>,
{
    let mut sums = BTreeMap::new();
    for AddressDelta { address, delta } in deltas {
        match sums.get_mut(&address) {
            Some(acc) => *acc += delta,
            None => {
                sums.insert(address, delta);
            }
        }
    }
    into_deltas(sums)
}

/// Turn a per-address sum map back into a delta list.
pub fn into_deltas(sums: BTreeMap<String, BigInt>) -> Vec<AddressDelta> {
    sums.into_iter()
        .map(|(address, delta)| AddressDelta { address, delta })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_same_address() {
        let merged = merge(vec![
            AddressDelta::new("A", 100),
            AddressDelta::new("B", 5),
            AddressDelta::new("A", -30),
        ]);
        assert_eq!(
            merged,
            vec![AddressDelta::new("A", 70), AddressDelta::new("B", 5)]
        );
    }

    #[test]
    fn merge_keeps_zero_sums() {
        let merged = merge(vec![AddressDelta::new("A", 100), AddressDelta::new("A", -100)]);
        assert_eq!(merged, vec![AddressDelta::new("A", 0)]);
    }

    #[test]
    fn merge_empty() {
        assert!(merge(Vec::new()).is_empty());
    }

    #[test]
    fn merge_beyond_u64() {
        let big: BigInt = "340282366920938463463374607431768211456".parse().unwrap(); // 2^128
        let merged = merge(vec![
            AddressDelta::new("A", big.clone()),
            AddressDelta::new("A", big.clone()),
        ]);
        assert_eq!(merged[0].delta, big * 2);
    }

    #[test]
    fn merge_nested_equals_flat() {
        let block_a = vec![AddressDelta::new("A", 10), AddressDelta::new("B", -4)];
        let block_b = vec![AddressDelta::new("B", 4), AddressDelta::new("C", 1)];

        let flat = merge(block_a.iter().chain(block_b.iter()).cloned());
        let nested = merge(merge(block_a).into_iter().chain(merge(block_b)));
        assert_eq!(flat, nested);
    }

    #[test]
    fn sum_delta_accumulates() {
        let mut sums = BTreeMap::new();
        sum_delta(&mut sums, "A", BigInt::from(7));
        sum_delta(&mut sums, "A", BigInt::from(-2));
        assert_eq!(sums["A"], BigInt::from(5));
    }
}
