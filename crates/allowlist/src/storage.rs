//! Allow-list storage layout.
//!
//! Each precompile keeps its allow-list in its own account storage. An
//! account's role lives in a single slot keyed by the account address as a
//! left-padded 32-byte word; an absent slot reads back as [`Role::None`].
//! Gas is charged by the caller, never here.

use crate::{
    error::{ContractError, StateError},
    state::StateDb,
    Role,
};
use alloy_primitives::{Address, B256};

/// Storage slot holding `account`'s role.
pub fn allow_list_key(account: Address) -> B256 {
    account.into_word()
}

/// Reads `account`'s role on the precompile at `precompile`.
///
/// A slot holding anything but a defined role is reported as
/// [`ContractError::InvalidRole`].
pub fn get_status<S>(
    state: &mut S,
    precompile: Address,
    account: Address,
) -> Result<Role, ContractError>
where
    S: StateDb + ?Sized,
{
    let word = state.get_state(precompile, allow_list_key(account))?;
    Ok(Role::from_word(word)?)
}

/// Writes `role` for `account` on the precompile at `precompile`.
pub fn set_status<S>(
    state: &mut S,
    precompile: Address,
    account: Address,
    role: Role,
) -> Result<(), StateError>
where
    S: StateDb + ?Sized,
{
    tracing::trace!(target: "allowlist", ?precompile, ?account, %role, "writing role");
    state.set_state(precompile, allow_list_key(account), role.to_word())
}
