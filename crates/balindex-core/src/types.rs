//! Shared types for the indexing pipeline.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

// ─── Transaction ──────────────────────────────────────────────────────────────

/// A transaction as returned by the block-data source.
///
/// Field names follow the Esplora REST JSON so the type deserialises the
/// upstream payload directly. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,
    #[serde(default)]
    pub status: TxStatus,
}

/// A transaction input. Coinbase inputs carry no `prevout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub prevout: Option<TxOutput>,
}

/// A transaction output (or the previous output spent by an input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Value in the chain's base unit (satoshis).
    pub value: u64,
    /// Destination address, absent for non-standard or data-carrier scripts.
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    #[serde(default)]
    pub block_height: Option<u64>,
}

// ─── BalanceRecord ────────────────────────────────────────────────────────────

/// The cumulative balance of one address, as held by the balance store.
///
/// Never zero: a balance that reaches zero is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: String,
    pub balance: BigInt,
}

impl BalanceRecord {
    pub fn new(address: impl Into<String>, balance: impl Into<BigInt>) -> Self {
        Self {
            address: address.into(),
            balance: balance.into(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
