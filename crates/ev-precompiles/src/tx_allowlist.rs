//! Transaction allow-list.
//!
//! While active, only senders holding at least [`Role::Enabled`](ev_allowlist::Role::Enabled) may submit
//! transactions.

use alloy_primitives::{address, Address};
use ev_allowlist::{
    allow_list_contract, get_status, AllowListGasSchedule, ContractError, StateDb,
    StatefulPrecompiledContract,
};

/// Address of the transaction allow-list precompile.
pub const TX_ALLOW_LIST_ADDRESS: Address = address!("0x0200000000000000000000000000000000000002");

/// Builds the transaction allow-list contract with the default gas schedule.
pub fn tx_allow_list() -> StatefulPrecompiledContract<AllowListGasSchedule> {
    allow_list_contract(TX_ALLOW_LIST_ADDRESS, AllowListGasSchedule::default())
}

/// Returns true if `sender` may submit transactions.
pub fn is_tx_allowed<S>(state: &mut S, sender: Address) -> Result<bool, ContractError>
where
    S: StateDb + ?Sized,
{
    let role = get_status(state, TX_ALLOW_LIST_ADDRESS, sender)?;
    Ok(role.is_enabled())
}
