//! Gas costs. These are consensus parameters: every node must charge exactly
//! the same amounts.

use crate::error::{ContractError, RunFailure};

/// Cost of writing one storage slot from a precompile.
pub const WRITE_GAS_COST_PER_SLOT: u64 = 20_000;

/// Cost of reading one storage slot from a precompile.
pub const READ_GAS_COST_PER_SLOT: u64 = 5_000;

/// Base cost of a log entry.
pub const LOG_GAS: u64 = 375;

/// Cost per log topic.
pub const LOG_TOPIC_GAS: u64 = 375;

/// Cost per byte of log data.
pub const LOG_DATA_GAS: u64 = 8;

/// Cost of any role setter.
pub const MODIFY_ALLOW_LIST_GAS_COST: u64 = WRITE_GAS_COST_PER_SLOT;

/// Cost of `readAllowList`.
pub const READ_ALLOW_LIST_GAS_COST: u64 = READ_GAS_COST_PER_SLOT;

/// Extra cost of a role-change event: signature, caller and target topics,
/// no data.
pub const ALLOW_LIST_EVENT_GAS_COST: u64 = LOG_GAS + 3 * LOG_TOPIC_GAS;

/// Per-function costs of the allow-list interface, fixed at contract
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowListGasSchedule {
    /// Charged by `setAdmin`, `setManager`, `setEnabled` and `setNone`.
    pub modify: u64,
    /// Charged by `readAllowList`.
    pub read: u64,
    /// Charged on top of `modify` when role-change events are active.
    pub event: u64,
}

impl Default for AllowListGasSchedule {
    fn default() -> Self {
        Self {
            modify: MODIFY_ALLOW_LIST_GAS_COST,
            read: READ_ALLOW_LIST_GAS_COST,
            event: ALLOW_LIST_EVENT_GAS_COST,
        }
    }
}

impl AsRef<Self> for AllowListGasSchedule {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Subtracts `cost` from `supplied`.
///
/// Running short is [`ContractError::OutOfGas`] with nothing left over.
pub fn deduct_gas(supplied: u64, cost: u64) -> Result<u64, RunFailure> {
    supplied
        .checked_sub(cost)
        .ok_or_else(|| ContractError::OutOfGas.with_gas(0))
}
