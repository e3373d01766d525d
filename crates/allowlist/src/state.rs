//! Interfaces the core consumes from the surrounding node: account storage,
//! fork activation, and the per-call execution context tying them together.

use crate::error::StateError;
use alloy_primitives::{Address, Log, B256, U256};
use serde::{Deserialize, Serialize};

/// Key-value account storage, mutated in place by the executing transaction.
///
/// Reads take `&mut self` because journaled backends track slot warmth on
/// access.
pub trait StateDb {
    /// Reads one storage word. Slots never written read back as zero.
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError>;

    /// Writes one storage word. Writing zero may be stored as a deletion.
    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError>;

    /// Appends a log entry to the transaction's output.
    fn add_log(&mut self, log: Log);

    /// Credits native balance to an account, creating it if missing.
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;
}

/// State access used between transactions when precompile upgrades activate.
pub trait UpgradeState: StateDb {
    /// Removes every storage slot of `address`. Reads afterwards return zero.
    fn clear_storage(&mut self, address: Address) -> Result<(), StateError>;
}

/// Timestamp-gated switches consulted by configuration and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hardfork {
    /// Introduces [`crate::Role::Manager`]: the `setManager` function and
    /// `managerAddresses` in configuration.
    ManagerRole,
    /// Role changes and mints append log entries (and pay for them).
    AllowListEvents,
}

/// Fork-activation predicates exposed by the chain configuration.
pub trait ChainConfig {
    /// Returns true if `fork` is active for a block with the given timestamp.
    fn is_fork_active(&self, fork: Hardfork, timestamp: u64) -> bool;
}

/// Activation timestamps for each [`Hardfork`]. `None` means never.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkSchedule {
    /// Activation time of [`Hardfork::ManagerRole`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_role_timestamp: Option<u64>,
    /// Activation time of [`Hardfork::AllowListEvents`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_list_events_timestamp: Option<u64>,
}

impl ForkSchedule {
    /// Schedule with every fork active from genesis.
    pub const fn all_active() -> Self {
        Self {
            manager_role_timestamp: Some(0),
            allow_list_events_timestamp: Some(0),
        }
    }

    /// Schedule with no fork ever active.
    pub const fn none_active() -> Self {
        Self {
            manager_role_timestamp: None,
            allow_list_events_timestamp: None,
        }
    }

    /// Returns the activation timestamp of `fork`, if scheduled.
    pub const fn activation(&self, fork: Hardfork) -> Option<u64> {
        match fork {
            Hardfork::ManagerRole => self.manager_role_timestamp,
            Hardfork::AllowListEvents => self.allow_list_events_timestamp,
        }
    }
}

impl ChainConfig for ForkSchedule {
    fn is_fork_active(&self, fork: Hardfork, timestamp: u64) -> bool {
        self.activation(fork)
            .is_some_and(|activation| timestamp >= activation)
    }
}

/// Everything a precompile call may touch, handed in explicitly per call.
///
/// Fork predicates are evaluated against `block_timestamp` on every access so
/// historical replay at any height sees the same answer.
pub struct ExecutionContext<'a> {
    /// Storage of the executing transaction.
    pub state: &'a mut dyn StateDb,
    /// Fork predicates of the chain.
    pub chain_config: &'a dyn ChainConfig,
    /// Timestamp of the block being executed.
    pub block_timestamp: u64,
}

impl<'a> ExecutionContext<'a> {
    /// Bundles the call's capabilities.
    pub fn new(
        state: &'a mut dyn StateDb,
        chain_config: &'a dyn ChainConfig,
        block_timestamp: u64,
    ) -> Self {
        Self {
            state,
            chain_config,
            block_timestamp,
        }
    }

    /// Returns true if `fork` is active at the current block.
    pub fn is_fork_active(&self, fork: Hardfork) -> bool {
        self.chain_config.is_fork_active(fork, self.block_timestamp)
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("block_timestamp", &self.block_timestamp)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_activates_at_timestamp() {
        let schedule = ForkSchedule {
            manager_role_timestamp: Some(100),
            allow_list_events_timestamp: None,
        };
        assert!(!schedule.is_fork_active(Hardfork::ManagerRole, 99));
        assert!(schedule.is_fork_active(Hardfork::ManagerRole, 100));
        assert!(schedule.is_fork_active(Hardfork::ManagerRole, 101));
        assert!(!schedule.is_fork_active(Hardfork::AllowListEvents, u64::MAX));
    }

    #[test]
    fn schedule_parses_camel_case() {
        let schedule: ForkSchedule =
            serde_json::from_str(r#"{"managerRoleTimestamp":5}"#).unwrap();
        assert_eq!(schedule.manager_role_timestamp, Some(5));
        assert_eq!(schedule.allow_list_events_timestamp, None);
    }
}
