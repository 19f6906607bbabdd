//! In-memory storage backend.
//!
//! Keeps balances and the cursor in RAM behind one lock, so every
//! `apply_deltas` is trivially atomic. Useful for tests and dry runs.

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::HashMap;
use std::sync::Mutex;

use balindex_core::delta::AddressDelta;
use balindex_core::error::IndexerError;
use balindex_core::store::{page_offset, BalanceStore};
use balindex_core::types::BalanceRecord;

#[derive(Default)]
struct State {
    balances: HashMap<String, BigInt>,
    last_height: u64,
}

impl State {
    fn page(&self, page: u64, page_size: u64) -> Vec<BalanceRecord> {
        let mut rows: Vec<BalanceRecord> = self
            .balances
            .iter()
            .map(|(address, balance)| BalanceRecord::new(address.clone(), balance.clone()))
            .collect();
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));

        rows.into_iter()
            .skip(page_offset(page, page_size) as usize)
            .take(page_size as usize)
            .collect()
    }
}

/// In-memory balance store.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, IndexerError> {
        self.state
            .lock()
            .map_err(|_| IndexerError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl BalanceStore for InMemoryStorage {
    async fn last_height(&self) -> Result<u64, IndexerError> {
        Ok(self.lock()?.last_height)
    }

    async fn set_last_height(&self, height: u64) -> Result<(), IndexerError> {
        self.lock()?.last_height = height;
        Ok(())
    }

    async fn apply_deltas(
        &self,
        deltas: &[AddressDelta],
        new_height: u64,
    ) -> Result<(), IndexerError> {
        let mut state = self.lock()?;
        for AddressDelta { address, delta } in deltas {
            let next = state.balances.get(address).cloned().unwrap_or_default() + delta;
            if next.is_zero() {
                state.balances.remove(address);
            } else {
                state.balances.insert(address.clone(), next);
            }
        }
        state.last_height = new_height;
        Ok(())
    }

    async fn list_by_balance_desc(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<BalanceRecord>, IndexerError> {
        Ok(self.lock()?.page(page, page_size))
    }

    async fn count(&self) -> Result<u64, IndexerError> {
        Ok(self.lock()?.balances.len() as u64)
    }

    async fn balance_page(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BalanceRecord>, u64), IndexerError> {
        let state = self.lock()?;
        Ok((state.page(page, page_size), state.balances.len() as u64))
    }

    async fn balance_of(&self, address: &str) -> Result<Option<BigInt>, IndexerError> {
        Ok(self.lock()?.balances.get(address).cloned())
    }
}
