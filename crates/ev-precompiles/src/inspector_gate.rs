//! Read-only enforcement for allow-list precompiles inside an EVM.
//!
//! [`PrecompileInput`](alloy_evm::precompiles::PrecompileInput) does not say
//! whether the calling frame is static, so the precompile itself cannot run
//! the read-only checkpoint. [`StaticCallGate`] sees the [`CallInputs`]
//! first: for a static frame it runs the contract's checkpoints with
//! `read_only` set, and a call that fails them ends before the precompile is
//! entered. Views pass through untouched.

use crate::registry::PrecompileRegistry;
use alloy_primitives::{Address, Bytes};
use ev_allowlist::{ContractError, RunFailure};
use revm::{
    context_interface::{Block, ContextTr},
    inspector::Inspector,
    interpreter::{
        CallInputs, CallOutcome, Gas, InstructionResult, InterpreterResult, InterpreterTypes,
    },
};
use std::sync::Arc;

/// Inspector rejecting state-changing calls to allow-list precompiles from
/// static frames.
///
/// Install it on every EVM that has the precompiles from
/// [`install_allow_list_precompiles`](crate::install_allow_list_precompiles),
/// and execute with inspection enabled.
#[derive(Debug, Clone)]
pub struct StaticCallGate {
    registry: Arc<PrecompileRegistry>,
}

impl StaticCallGate {
    /// Gate over the precompiles of `registry`.
    pub const fn new(registry: Arc<PrecompileRegistry>) -> Self {
        Self { registry }
    }

    /// Failure a static call into `address` ends with, or `None` if it may
    /// reach the precompile.
    pub fn check(
        &self,
        address: Address,
        timestamp: u64,
        input: &[u8],
        gas_limit: u64,
    ) -> Option<RunFailure> {
        if !self.registry.is_active(address, timestamp) {
            return None;
        }
        self.registry
            .contract(address)?
            .precheck(self.registry.fork_schedule(), timestamp, input, gas_limit, true)
            .err()
    }
}

/// Interpreter result of a call stopped by the gate. The frame's gas is
/// consumed, as for any failed precompile.
fn blocked_result(failure: &RunFailure, gas_limit: u64) -> InterpreterResult {
    let result = match failure.error {
        ContractError::WriteProtection => InstructionResult::StateChangeDuringStaticCall,
        ContractError::OutOfGas => InstructionResult::PrecompileOOG,
        _ => InstructionResult::PrecompileError,
    };
    InterpreterResult::new(result, Bytes::new(), Gas::new_spent(gas_limit))
}

impl<CTX, INTR> Inspector<CTX, INTR> for StaticCallGate
where
    CTX: ContextTr,
    INTR: InterpreterTypes,
{
    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        if !inputs.is_static {
            return None;
        }
        let timestamp = context.block().timestamp().saturating_to::<u64>();
        let input = inputs.input.bytes(context);
        let failure = self.check(inputs.bytecode_address, timestamp, &input, inputs.gas_limit)?;

        tracing::debug!(
            target: "precompile_evm",
            precompile = ?inputs.bytecode_address,
            caller = ?inputs.caller,
            error = %failure.error,
            "static call rejected"
        );
        Some(CallOutcome::new(
            blocked_result(&failure, inputs.gas_limit),
            inputs.return_memory_offset.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AllowListPrecompileConfig, NativeMinterConfig, PrecompileSettings, PrecompileUpgrade},
        native_minter::{INativeMinter, NATIVE_MINTER_ADDRESS},
        tx_allowlist::TX_ALLOW_LIST_ADDRESS,
    };
    use alloy_primitives::{address, U256};
    use alloy_sol_types::SolCall;
    use ev_allowlist::{
        abi::IAllowList, gas::MODIFY_ALLOW_LIST_GAS_COST, get_status, test_utils::MemoryState,
        AllowListConfig, ForkSchedule, Role, Upgrade,
    };

    const ADMIN: Address = address!("0x00000000000000000000000000000000000000a1");
    const USER: Address = address!("0x00000000000000000000000000000000000000b1");
    const GAS_LIMIT: u64 = 100_000;

    fn admins() -> AllowListConfig {
        AllowListConfig {
            admin_addresses: vec![ADMIN],
            ..Default::default()
        }
    }

    fn registry() -> Arc<PrecompileRegistry> {
        let registry = PrecompileRegistry::new(PrecompileSettings {
            fork_schedule: ForkSchedule::all_active(),
            precompile_upgrades: vec![
                PrecompileUpgrade::TxAllowListConfig(AllowListPrecompileConfig::enable_at(
                    0,
                    admins(),
                )),
                PrecompileUpgrade::ContractNativeMinterConfig(NativeMinterConfig {
                    upgrade: Upgrade::at(10),
                    allow_list: admins(),
                    initial_mint: Default::default(),
                }),
            ],
        })
        .expect("valid settings");
        Arc::new(registry)
    }

    #[test]
    fn static_setter_is_stopped_before_the_precompile() {
        let registry = registry();
        let mut state = MemoryState::default();
        registry.apply_activations(None, 0, &mut state).unwrap();
        let slots = state.storage_len();
        let gate = StaticCallGate::new(Arc::clone(&registry));

        let input = IAllowList::setEnabledCall { addr: USER }.abi_encode();
        let failure = gate
            .check(TX_ALLOW_LIST_ADDRESS, 0, &input, GAS_LIMIT)
            .expect("static setter is rejected");

        assert_eq!(failure.error, ContractError::WriteProtection);
        assert_eq!(failure.remaining_gas, GAS_LIMIT - MODIFY_ALLOW_LIST_GAS_COST);

        let result = blocked_result(&failure, GAS_LIMIT);
        assert_eq!(result.result, InstructionResult::StateChangeDuringStaticCall);
        assert_eq!(result.gas.remaining(), 0, "the frame's gas is consumed");
        assert!(result.output.is_empty());

        assert_eq!(get_status(&mut state, TX_ALLOW_LIST_ADDRESS, USER), Ok(Role::None));
        assert_eq!(state.storage_len(), slots, "nothing was written");
    }

    #[test]
    fn static_mint_is_stopped_once_the_minter_is_active() {
        let gate = StaticCallGate::new(registry());
        let input = INativeMinter::mintNativeCoinCall {
            addr: USER,
            amount: U256::from(1u64),
        }
        .abi_encode();

        assert!(gate.check(NATIVE_MINTER_ADDRESS, 9, &input, GAS_LIMIT).is_none());
        let failure = gate
            .check(NATIVE_MINTER_ADDRESS, 10, &input, GAS_LIMIT)
            .expect("static mint is rejected");
        assert_eq!(failure.error, ContractError::WriteProtection);
    }

    #[test]
    fn views_and_foreign_addresses_pass() {
        let gate = StaticCallGate::new(registry());

        let read = IAllowList::readAllowListCall { addr: ADMIN }.abi_encode();
        assert!(gate.check(TX_ALLOW_LIST_ADDRESS, 0, &read, GAS_LIMIT).is_none());

        let setter = IAllowList::setEnabledCall { addr: USER }.abi_encode();
        assert!(gate.check(USER, 0, &setter, GAS_LIMIT).is_none());
    }

    #[test]
    fn short_gas_maps_to_precompile_out_of_gas() {
        let gate = StaticCallGate::new(registry());
        let setter = IAllowList::setEnabledCall { addr: USER }.abi_encode();

        let failure = gate
            .check(TX_ALLOW_LIST_ADDRESS, 0, &setter, MODIFY_ALLOW_LIST_GAS_COST - 1)
            .expect("out of gas");

        assert_eq!(failure.error, ContractError::OutOfGas);
        assert_eq!(
            blocked_result(&failure, MODIFY_ALLOW_LIST_GAS_COST - 1).result,
            InstructionResult::PrecompileOOG
        );
    }
}
