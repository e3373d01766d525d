//! In-memory [`StateDb`] for tests.

use crate::{
    error::StateError,
    state::{StateDb, UpgradeState},
};
use alloy_primitives::{Address, Log, B256, U256};
use std::collections::HashMap;

/// Flat storage, log and balance maps standing in for a journaled state.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    storage: HashMap<(Address, B256), B256>,
    balances: HashMap<Address, U256>,
    logs: Vec<Log>,
}

impl MemoryState {
    /// Logs appended so far, in order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Native balance of `address`.
    pub fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    /// Number of non-zero storage slots across all accounts.
    pub fn storage_len(&self) -> usize {
        self.storage.len()
    }
}

impl StateDb for MemoryState {
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError> {
        Ok(self
            .storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default())
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError> {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
        Ok(())
    }

    fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let balance = self.balances.entry(address).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| StateError::new("balance overflow"))?;
        Ok(())
    }
}

impl UpgradeState for MemoryState {
    fn clear_storage(&mut self, address: Address) -> Result<(), StateError> {
        self.storage.retain(|(owner, _), _| *owner != address);
        Ok(())
    }
}
