//! Contract deployer allow-list.
//!
//! Only accounts holding at least [`Role::Enabled`](ev_allowlist::Role::Enabled) may create contracts
//! while this precompile is active.

use alloy_primitives::{address, Address};
use ev_allowlist::{
    allow_list_contract, get_status, AllowListGasSchedule, ContractError, StateDb,
    StatefulPrecompiledContract,
};

/// Address of the contract deployer allow-list precompile.
pub const CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS: Address =
    address!("0x0200000000000000000000000000000000000000");

/// Builds the deployer allow-list contract with the default gas schedule.
pub fn contract_deployer_allow_list() -> StatefulPrecompiledContract<AllowListGasSchedule> {
    allow_list_contract(
        CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS,
        AllowListGasSchedule::default(),
    )
}

/// Returns true if `deployer` holds a role permitting contract creation.
pub fn is_deploy_allowed<S>(state: &mut S, deployer: Address) -> Result<bool, ContractError>
where
    S: StateDb + ?Sized,
{
    let role = get_status(state, CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS, deployer)?;
    Ok(role.is_enabled())
}
