//! The `BalanceStore` trait — durable address balances plus the progress
//! cursor, updated together.

use async_trait::async_trait;
use num_bigint::{BigInt, Sign};

use crate::delta::AddressDelta;
use crate::error::IndexerError;
use crate::types::BalanceRecord;

/// Storage for cumulative balances and the single progress cursor.
///
/// Implementations include `InMemoryStorage` and `SqliteStorage` in
/// `balindex-storage`.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Height of the last fully-applied block (0 before any indexing).
    async fn last_height(&self) -> Result<u64, IndexerError>;

    /// Overwrite the cursor without touching balances.
    async fn set_last_height(&self, height: u64) -> Result<(), IndexerError>;

    /// Add every delta to its address balance and move the cursor to
    /// `new_height`, as one all-or-nothing unit.
    ///
    /// A balance that ends at exactly zero is deleted.
    async fn apply_deltas(
        &self,
        deltas: &[AddressDelta],
        new_height: u64,
    ) -> Result<(), IndexerError>;

    /// One page of balances, highest first, ties broken by address.
    /// `page` is 1-based.
    async fn list_by_balance_desc(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<BalanceRecord>, IndexerError>;

    /// Total number of addresses with a nonzero balance.
    async fn count(&self) -> Result<u64, IndexerError>;

    /// One page plus the total count, both read from the same snapshot so a
    /// concurrent `apply_deltas` is seen entirely or not at all.
    async fn balance_page(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BalanceRecord>, u64), IndexerError>;

    /// Current balance of a single address, `None` if it has no row.
    async fn balance_of(&self, address: &str) -> Result<Option<BigInt>, IndexerError>;
}

/// Offset of the first row of a 1-based `page`.
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.max(1).saturating_sub(1).saturating_mul(page_size)
}

/// Text key whose lexical order matches the numeric order of `balance`.
///
/// Positive values encode as `p` + 20-digit length + digits; negative values
/// as `n` + complemented length + nine's-complement digits, so that a larger
/// magnitude sorts lower. Zero encodes as `o` (between the two) although the
/// store never keeps zero rows.
pub fn balance_sort_key(balance: &BigInt) -> String {
    let digits = balance.magnitude().to_str_radix(10);
    match balance.sign() {
        Sign::Plus => format!("p{:020}{digits}", digits.len()),
        Sign::NoSign => "o".to_string(),
        Sign::Minus => {
            let len = u64::MAX - digits.len() as u64;
            let complement: String = digits
                .bytes()
                .map(|b| char::from(b'9' - (b - b'0')))
                .collect();
            format!("n{len:020}{complement}")
        }
    }
}

/// Parse a balance stored as decimal text.
pub fn parse_balance(text: &str) -> Result<BigInt, IndexerError> {
    text.parse::<BigInt>()
        .map_err(|e| IndexerError::InvalidData(format!("balance '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
    }

    #[test]
    fn sort_key_matches_numeric_order() {
        let values: Vec<BigInt> = [
            "-100000000000000000000000",
            "-1000",
            "-999",
            "-91",
            "-9",
            "-1",
            "0",
            "1",
            "9",
            "10",
            "99",
            "100",
            "123456789012345678901234567890",
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

        let mut keyed: Vec<(String, BigInt)> = values
            .iter()
            .rev()
            .map(|v| (balance_sort_key(v), v.clone()))
            .collect();
        keyed.sort();

        let sorted: Vec<BigInt> = keyed.into_iter().map(|(_, v)| v).collect();
        assert_eq!(sorted, values);
    }

    #[test]
    fn lexical_order_would_be_wrong() {
        // "9" > "10" lexically; the key fixes that.
        let nine = BigInt::from(9);
        let ten = BigInt::from(10);
        assert!(balance_sort_key(&nine) < balance_sort_key(&ten));
    }

    #[test]
    fn parse_balance_rejects_garbage() {
        assert_eq!(parse_balance("-42").unwrap(), BigInt::from(-42));
        assert!(matches!(parse_balance("4.2"), Err(IndexerError::InvalidData(_))));
    }
}
