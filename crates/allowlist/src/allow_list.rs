//! The allow-list functions shared by every gated precompile.
//!
//! | Function | Gas | Gate |
//! |----------|-----|------|
//! | `setAdmin(address)` | `modify` (+ `event`) | |
//! | `setManager(address)` | `modify` (+ `event`) | [`Hardfork::ManagerRole`] |
//! | `setEnabled(address)` | `modify` (+ `event`) | |
//! | `setNone(address)` | `modify` (+ `event`) | |
//! | `readAllowList(address)` | `read` | |
//!
//! The `event` surcharge applies only while [`Hardfork::AllowListEvents`] is
//! active.

use crate::{
    abi::{decode_address_arg, IAllowList},
    contract::{CallFrame, Mutability, PrecompileFunction, RunOutput, RunResult, StatefulPrecompiledContract},
    error::ContractError,
    events::role_change_log,
    gas::{deduct_gas, AllowListGasSchedule},
    state::{ExecutionContext, Hardfork},
    storage::{get_status, set_status},
    Role,
};
use alloy_primitives::{Address, Bytes};

/// Registrations for the five allow-list functions, for any contract whose
/// payload exposes an [`AllowListGasSchedule`].
pub fn allow_list_functions<T>() -> Vec<PrecompileFunction<T>>
where
    T: AsRef<AllowListGasSchedule>,
{
    vec![
        PrecompileFunction::new::<IAllowList::setAdminCall>(
            Mutability::Mutating,
            modify_cost::<T>,
            set_admin::<T>,
        ),
        PrecompileFunction::new::<IAllowList::setManagerCall>(
            Mutability::Mutating,
            modify_cost::<T>,
            set_manager::<T>,
        )
        .activated_at(Hardfork::ManagerRole),
        PrecompileFunction::new::<IAllowList::setEnabledCall>(
            Mutability::Mutating,
            modify_cost::<T>,
            set_enabled::<T>,
        ),
        PrecompileFunction::new::<IAllowList::setNoneCall>(
            Mutability::Mutating,
            modify_cost::<T>,
            set_none::<T>,
        ),
        PrecompileFunction::new::<IAllowList::readAllowListCall>(
            Mutability::View,
            read_cost::<T>,
            read_allow_list::<T>,
        ),
    ]
}

/// A precompile exposing nothing but the allow-list functions.
pub fn allow_list_contract(
    address: Address,
    gas: AllowListGasSchedule,
) -> StatefulPrecompiledContract<AllowListGasSchedule> {
    StatefulPrecompiledContract::new(address, gas, allow_list_functions())
}

fn modify_cost<T: AsRef<AllowListGasSchedule>>(inner: &T) -> u64 {
    inner.as_ref().modify
}

fn read_cost<T: AsRef<AllowListGasSchedule>>(inner: &T) -> u64 {
    inner.as_ref().read
}

fn set_admin<T: AsRef<AllowListGasSchedule>>(
    inner: &T,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    set_role(inner.as_ref(), ctx, frame, remaining, Role::Admin)
}

fn set_manager<T: AsRef<AllowListGasSchedule>>(
    inner: &T,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    set_role(inner.as_ref(), ctx, frame, remaining, Role::Manager)
}

fn set_enabled<T: AsRef<AllowListGasSchedule>>(
    inner: &T,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    set_role(inner.as_ref(), ctx, frame, remaining, Role::Enabled)
}

fn set_none<T: AsRef<AllowListGasSchedule>>(
    inner: &T,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    set_role(inner.as_ref(), ctx, frame, remaining, Role::None)
}

/// Moves the target named in the payload to `role` if the caller's role
/// allows it.
///
/// The event surcharge is deducted before the write, so running out of gas
/// there leaves storage untouched.
fn set_role(
    gas: &AllowListGasSchedule,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
    role: Role,
) -> RunResult {
    let target = decode_address_arg(frame.input).map_err(|err| err.with_gas(remaining))?;

    let caller_role = get_status(&mut *ctx.state, frame.address, frame.caller)
        .map_err(|err| err.with_gas(remaining))?;
    let target_role =
        get_status(&mut *ctx.state, frame.address, target).map_err(|err| err.with_gas(remaining))?;

    if !caller_role.can_modify(target_role, role) {
        tracing::warn!(
            target: "allowlist",
            precompile = ?frame.address,
            caller = ?frame.caller,
            %caller_role,
            ?target,
            from = %target_role,
            to = %role,
            "role change denied"
        );
        return Err(ContractError::CannotModifyAllowList {
            caller: frame.caller,
            caller_role,
            target,
            from: target_role,
            to: role,
        }
        .with_gas(remaining));
    }

    let emit_event = ctx.is_fork_active(Hardfork::AllowListEvents);
    let remaining = if emit_event {
        deduct_gas(remaining, gas.event)?
    } else {
        remaining
    };

    set_status(&mut *ctx.state, frame.address, target, role)
        .map_err(|err| ContractError::from(err).with_gas(remaining))?;
    if emit_event {
        ctx.state
            .add_log(role_change_log(frame.address, role, frame.caller, target));
    }

    tracing::info!(
        target: "allowlist",
        precompile = ?frame.address,
        caller = ?frame.caller,
        ?target,
        from = %target_role,
        to = %role,
        emit_event,
        "role changed"
    );
    Ok(RunOutput::new(Bytes::new(), remaining))
}

fn read_allow_list<T: AsRef<AllowListGasSchedule>>(
    _inner: &T,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    let account = decode_address_arg(frame.input).map_err(|err| err.with_gas(remaining))?;
    let role = get_status(&mut *ctx.state, frame.address, account)
        .map_err(|err| err.with_gas(remaining))?;
    Ok(RunOutput::new(
        Bytes::copy_from_slice(role.to_word().as_slice()),
        remaining,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gas::MODIFY_ALLOW_LIST_GAS_COST, state::ForkSchedule, test_utils::MemoryState};
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;

    const PRECOMPILE: Address = address!("0x0200000000000000000000000000000000000002");
    const ADMIN: Address = address!("0x00000000000000000000000000000000000000a1");
    const TARGET: Address = address!("0x00000000000000000000000000000000000000b1");

    fn seeded_state() -> MemoryState {
        let mut state = MemoryState::default();
        set_status(&mut state, PRECOMPILE, ADMIN, Role::Admin).unwrap();
        state
    }

    #[test]
    fn registers_every_allow_list_selector() {
        let contract = allow_list_contract(PRECOMPILE, AllowListGasSchedule::default());
        let selectors: Vec<_> = contract
            .functions()
            .iter()
            .map(|function| function.signature())
            .collect();
        assert_eq!(selectors.len(), 5);
        for role in Role::ALL {
            let signature = format!("{}(address)", role.setter_function_name());
            assert!(
                selectors.contains(&signature.as_str()),
                "missing {signature}"
            );
        }
    }

    #[test]
    fn admin_can_revoke_another_admin() {
        let other = address!("0x00000000000000000000000000000000000000a2");
        let contract = allow_list_contract(PRECOMPILE, AllowListGasSchedule::default());
        let mut state = seeded_state();
        set_status(&mut state, PRECOMPILE, other, Role::Admin).unwrap();
        let chain = ForkSchedule::none_active();
        let mut ctx = ExecutionContext::new(&mut state, &chain, 0);

        let input = IAllowList::setNoneCall { addr: other }.abi_encode();
        let out = contract
            .dispatch(&mut ctx, ADMIN, &input, MODIFY_ALLOW_LIST_GAS_COST, false)
            .expect("admin may demote admins");

        assert_eq!(out.remaining_gas, 0, "the modify cost is billed exactly");
        assert_eq!(get_status(&mut state, PRECOMPILE, other), Ok(Role::None));
    }

    #[test]
    fn malformed_payload_keeps_remaining_gas() {
        let contract = allow_list_contract(PRECOMPILE, AllowListGasSchedule::default());
        let mut state = seeded_state();
        let chain = ForkSchedule::none_active();
        let mut ctx = ExecutionContext::new(&mut state, &chain, 0);

        let mut input = IAllowList::setEnabledCall { addr: TARGET }.abi_encode();
        input.pop();
        let err = contract
            .dispatch(&mut ctx, ADMIN, &input, MODIFY_ALLOW_LIST_GAS_COST + 7, false)
            .unwrap_err();

        assert!(matches!(err.error, ContractError::MalformedInput(_)));
        assert_eq!(err.remaining_gas, 7);
    }

    #[test]
    fn out_of_gas_on_event_surcharge_leaves_storage_untouched() {
        let gas = AllowListGasSchedule::default();
        let contract = allow_list_contract(PRECOMPILE, gas);
        let mut state = seeded_state();
        let chain = ForkSchedule::all_active();
        let mut ctx = ExecutionContext::new(&mut state, &chain, 0);

        let input = IAllowList::setEnabledCall { addr: TARGET }.abi_encode();
        let err = contract
            .dispatch(&mut ctx, ADMIN, &input, gas.modify + gas.event - 1, false)
            .unwrap_err();

        assert_eq!(err.error, ContractError::OutOfGas);
        assert_eq!(err.remaining_gas, 0);
        assert_eq!(get_status(&mut state, PRECOMPILE, TARGET), Ok(Role::None));
        assert!(state.logs().is_empty());
    }

    #[test]
    fn reading_a_corrupted_slot_fails_instead_of_defaulting() {
        use crate::state::StateDb;
        use alloy_primitives::{B256, U256};

        let contract = allow_list_contract(PRECOMPILE, AllowListGasSchedule::default());
        let mut state = MemoryState::default();
        state
            .set_state(
                PRECOMPILE,
                crate::storage::allow_list_key(TARGET),
                B256::from(U256::from(9u64)),
            )
            .unwrap();
        let chain = ForkSchedule::none_active();
        let mut ctx = ExecutionContext::new(&mut state, &chain, 0);

        let input = IAllowList::readAllowListCall { addr: TARGET }.abi_encode();
        let err = contract
            .dispatch(&mut ctx, ADMIN, &input, 10_000, false)
            .unwrap_err();

        assert!(matches!(err.error, ContractError::InvalidRole(_)));
    }
}
