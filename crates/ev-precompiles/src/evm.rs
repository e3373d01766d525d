//! Plugs allow-list precompiles into an `alloy-evm` EVM.
//!
//! Storage, logs and balances go through the transaction journal exposed by
//! [`EvmInternals`], so every write is reverted with the frame that made it.

use crate::registry::PrecompileRegistry;
use alloy_evm::{
    precompiles::{DynPrecompile, Precompile, PrecompileInput, PrecompilesMap},
    revm::precompile::{PrecompileError, PrecompileId, PrecompileResult},
    EvmInternals, EvmInternalsError,
};
use alloy_primitives::{Address, Bytes, Log, B256, U256};
use ev_allowlist::{ContractError, ExecutionContext, ForkSchedule, StateDb, StateError, StatefulPrecompile};
use revm::{bytecode::Bytecode, precompile::PrecompileOutput};
use std::sync::{Arc, OnceLock};

/// Bytecode stored at a precompile account on first touch.
///
/// A lone `0xFE` (INVALID) keeps the account from being pruned as empty and
/// cannot be executed as a normal contract.
fn precompile_bytecode() -> &'static Bytecode {
    static BYTECODE: OnceLock<Bytecode> = OnceLock::new();
    BYTECODE.get_or_init(|| Bytecode::new_raw(Bytes::from_static(&[0xFE])))
}

/// An allow-list contract exposed as an EVM precompile.
#[derive(Debug, Clone)]
pub struct EvmAllowListPrecompile {
    id: PrecompileId,
    contract: Arc<dyn StatefulPrecompile>,
    fork_schedule: ForkSchedule,
}

impl EvmAllowListPrecompile {
    /// Wraps `contract`, evaluating forks against `fork_schedule`.
    pub fn new(
        name: &'static str,
        contract: Arc<dyn StatefulPrecompile>,
        fork_schedule: ForkSchedule,
    ) -> Self {
        Self {
            id: PrecompileId::custom(name),
            contract,
            fork_schedule,
        }
    }

    /// Address the precompile is installed at.
    pub fn address(&self) -> Address {
        self.contract.address()
    }
}

impl Precompile for EvmAllowListPrecompile {
    fn precompile_id(&self) -> &PrecompileId {
        &self.id
    }

    fn call(&self, mut input: PrecompileInput<'_>) -> PrecompileResult {
        let caller = input.caller;
        let gas_limit = input.gas;
        let data = input.data;
        let internals = input.internals_mut();
        let timestamp = internals.block_timestamp().saturating_to::<u64>();

        let mut state = JournalState {
            internals,
            precompile: self.contract.address(),
        };
        let mut ctx = ExecutionContext::new(&mut state, &self.fork_schedule, timestamp);

        // PrecompileInput carries no static flag. Static frames are screened
        // by `StaticCallGate` before they get here.
        match self.contract.run(&mut ctx, caller, data, gas_limit, false) {
            Ok(out) => Ok(PrecompileOutput::new(
                gas_limit.saturating_sub(out.remaining_gas),
                out.output,
            )),
            Err(failure) => {
                tracing::debug!(
                    target: "precompile_evm",
                    precompile = ?self.contract.address(),
                    ?caller,
                    error = %failure.error,
                    remaining_gas = failure.remaining_gas,
                    "precompile call failed"
                );
                match failure.error {
                    ContractError::OutOfGas => Err(PrecompileError::OutOfGas),
                    error => Err(PrecompileError::Other(error.to_string().into())),
                }
            }
        }
    }

    fn is_pure(&self) -> bool {
        false
    }
}

/// [`StateDb`] over the journal of the executing transaction.
struct JournalState<'a, 'b> {
    internals: &'a mut EvmInternals<'b>,
    precompile: Address,
}

impl JournalState<'_, '_> {
    fn map_internals_error(err: EvmInternalsError) -> StateError {
        StateError::new(err)
    }

    /// Loads `address`, creating it if missing. The precompile's own account
    /// also gets its marker bytecode.
    fn ensure_account_created(&mut self, address: Address) -> Result<(), StateError> {
        let missing = self
            .internals
            .load_account(address)
            .map_err(Self::map_internals_error)?
            .is_loaded_as_not_existing();

        if missing {
            if address == self.precompile {
                self.internals
                    .set_code(address, precompile_bytecode().clone());
                self.internals.nonce_bump_journal_entry(address);
            }
            self.internals.touch_account(address);
        }
        Ok(())
    }
}

impl StateDb for JournalState<'_, '_> {
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError> {
        // Reads only warm the account; creating it is left to the first write.
        self.internals
            .load_account(address)
            .map_err(Self::map_internals_error)?;
        let value = self
            .internals
            .sload(address, key.into())
            .map_err(Self::map_internals_error)?;
        Ok(B256::from(*value))
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError> {
        self.ensure_account_created(address)?;
        self.internals
            .sstore(address, key.into(), value.into())
            .map_err(Self::map_internals_error)?;
        self.internals.touch_account(address);
        Ok(())
    }

    fn add_log(&mut self, log: Log) {
        self.internals.log(log);
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        self.ensure_account_created(address)?;
        let balance = self
            .internals
            .load_account(address)
            .map_err(Self::map_internals_error)?
            .info
            .balance;
        let new_balance = balance
            .checked_add(amount)
            .ok_or_else(|| StateError::new("balance overflow"))?;
        self.internals
            .set_balance(address, new_balance)
            .map_err(Self::map_internals_error)?;
        Ok(())
    }
}

/// Installs every allow-list precompile active at `timestamp` into
/// `precompiles`, replacing whatever was registered at those addresses.
///
/// The precompile set of an EVM is fixed per block, so this is called once
/// per block environment.
pub fn install_allow_list_precompiles(
    precompiles: &mut PrecompilesMap,
    registry: &PrecompileRegistry,
    timestamp: u64,
) {
    for contract in registry.active_contracts(timestamp) {
        let address = contract.address();
        let Some(config) = registry.active_config(address, timestamp) else {
            continue;
        };
        let precompile = Arc::new(EvmAllowListPrecompile::new(
            config.name(),
            Arc::clone(contract),
            *registry.fork_schedule(),
        ));
        let id = precompile.precompile_id().clone();

        precompiles.apply_precompile(&address, move |_| {
            Some(DynPrecompile::new_stateful(id, move |input| {
                precompile.call(input)
            }))
        });
        tracing::debug!(target: "precompile_evm", ?address, timestamp, "installed allow-list precompile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AllowListPrecompileConfig, PrecompileSettings, PrecompileUpgrade},
        native_minter::{native_minter, INativeMinter, NATIVE_MINTER_ADDRESS},
        tx_allowlist::{tx_allow_list, TX_ALLOW_LIST_ADDRESS},
    };
    use alloy_primitives::address;
    use alloy_sol_types::{SolCall, SolEvent};
    use ev_allowlist::{
        abi::IAllowList,
        gas::{ALLOW_LIST_EVENT_GAS_COST, MODIFY_ALLOW_LIST_GAS_COST},
        storage::allow_list_key,
        AllowListConfig, Role,
    };
    use revm::{
        context::{
            journal::{Journal, JournalInner},
            BlockEnv,
        },
        database::{CacheDB, EmptyDB},
        precompile::Precompiles,
        primitives::hardfork::SpecId,
    };

    type TestJournal = Journal<CacheDB<EmptyDB>>;

    const GAS_LIMIT: u64 = 1_000_000;
    const ADMIN: Address = address!("0x00000000000000000000000000000000000000a1");
    const USER: Address = address!("0x00000000000000000000000000000000000000b1");

    fn setup_context() -> (TestJournal, BlockEnv) {
        let mut journal = Journal::new_with_inner(CacheDB::default(), JournalInner::new());
        journal.inner.set_spec_id(SpecId::PRAGUE);
        let block_env = BlockEnv::default();
        (journal, block_env)
    }

    fn run_call(
        journal: &mut TestJournal,
        block_env: &BlockEnv,
        precompile: &EvmAllowListPrecompile,
        caller: Address,
        data: &[u8],
    ) -> PrecompileResult {
        let input = PrecompileInput {
            data,
            gas: GAS_LIMIT,
            caller,
            value: U256::ZERO,
            target_address: precompile.address(),
            bytecode_address: precompile.address(),
            internals: EvmInternals::new(journal, block_env),
        };
        precompile.call(input)
    }

    fn storage_at(journal: &TestJournal, address: Address, key: B256) -> U256 {
        journal
            .inner
            .state
            .get(&address)
            .and_then(|account| account.storage.get(&U256::from_be_bytes(key.0)))
            .map(|slot| slot.present_value)
            .unwrap_or_default()
    }

    /// Seeds `ADMIN` as admin of the transaction allow-list directly in the journal.
    fn seeded_tx_allow_list(journal: &mut TestJournal, block_env: &BlockEnv) -> EvmAllowListPrecompile {
        let precompile = EvmAllowListPrecompile::new(
            "txAllowListConfig",
            Arc::new(tx_allow_list()),
            ForkSchedule::all_active(),
        );
        let mut internals = EvmInternals::new(journal, block_env);
        let mut state = JournalState {
            internals: &mut internals,
            precompile: TX_ALLOW_LIST_ADDRESS,
        };
        AllowListConfig {
            admin_addresses: vec![ADMIN],
            ..Default::default()
        }
        .configure(&mut state, TX_ALLOW_LIST_ADDRESS)
        .expect("journal write succeeds");
        precompile
    }

    #[test]
    fn set_enabled_writes_journal_storage_and_log() {
        let (mut journal, block_env) = setup_context();
        let precompile = seeded_tx_allow_list(&mut journal, &block_env);

        let calldata = IAllowList::setEnabledCall { addr: USER }.abi_encode();
        let output = run_call(&mut journal, &block_env, &precompile, ADMIN, &calldata)
            .expect("admin may enable");

        assert_eq!(
            output.gas_used,
            MODIFY_ALLOW_LIST_GAS_COST + ALLOW_LIST_EVENT_GAS_COST
        );
        assert_eq!(
            storage_at(&journal, TX_ALLOW_LIST_ADDRESS, allow_list_key(USER)),
            U256::from(Role::Enabled)
        );

        let log = journal.inner.logs.last().expect("role change logged");
        assert_eq!(log.address, TX_ALLOW_LIST_ADDRESS);
        assert_eq!(log.topics()[0], IAllowList::EnabledAdded::SIGNATURE_HASH);

        let account = journal.inner.state.get(&TX_ALLOW_LIST_ADDRESS).unwrap();
        assert!(account.is_touched(), "precompile account should be touched");
        assert_eq!(
            account.info.code.as_ref().map(|code| code.original_bytes()),
            Some(Bytes::from_static(&[0xFE])),
            "precompile account carries the marker bytecode"
        );
    }

    #[test]
    fn denied_change_maps_to_precompile_error() {
        let (mut journal, block_env) = setup_context();
        let precompile = seeded_tx_allow_list(&mut journal, &block_env);

        let calldata = IAllowList::setAdminCall { addr: USER }.abi_encode();
        let err = run_call(&mut journal, &block_env, &precompile, USER, &calldata).unwrap_err();

        assert!(matches!(err, PrecompileError::Other(_)), "unexpected error {err:?}");
        assert_eq!(
            storage_at(&journal, TX_ALLOW_LIST_ADDRESS, allow_list_key(USER)),
            U256::ZERO
        );
    }

    #[test]
    fn insufficient_gas_maps_to_out_of_gas() {
        let (mut journal, block_env) = setup_context();
        let precompile = seeded_tx_allow_list(&mut journal, &block_env);
        let calldata = IAllowList::setEnabledCall { addr: USER }.abi_encode();

        let input = PrecompileInput {
            data: &calldata,
            gas: MODIFY_ALLOW_LIST_GAS_COST - 1,
            caller: ADMIN,
            value: U256::ZERO,
            target_address: TX_ALLOW_LIST_ADDRESS,
            bytecode_address: TX_ALLOW_LIST_ADDRESS,
            internals: EvmInternals::new(&mut journal, &block_env),
        };

        assert!(matches!(precompile.call(input), Err(PrecompileError::OutOfGas)));
    }

    #[test]
    fn read_returns_role_word() {
        let (mut journal, block_env) = setup_context();
        let precompile = seeded_tx_allow_list(&mut journal, &block_env);

        let calldata = IAllowList::readAllowListCall { addr: ADMIN }.abi_encode();
        let output = run_call(&mut journal, &block_env, &precompile, USER, &calldata).unwrap();

        let role = IAllowList::readAllowListCall::abi_decode_returns(&output.bytes).unwrap();
        assert_eq!(role, U256::from(Role::Admin));
    }

    #[test]
    fn read_leaves_untouched_precompile_account_alone() {
        let (mut journal, block_env) = setup_context();
        let precompile = EvmAllowListPrecompile::new(
            "txAllowListConfig",
            Arc::new(tx_allow_list()),
            ForkSchedule::all_active(),
        );

        let calldata = IAllowList::readAllowListCall { addr: USER }.abi_encode();
        let output = run_call(&mut journal, &block_env, &precompile, USER, &calldata).unwrap();

        let role = IAllowList::readAllowListCall::abi_decode_returns(&output.bytes).unwrap();
        assert_eq!(role, U256::from(Role::None));
        let account = journal
            .inner
            .state
            .get(&TX_ALLOW_LIST_ADDRESS)
            .expect("account warmed by the read");
        assert!(!account.is_touched(), "a read must not touch the precompile account");
        assert_ne!(
            account.info.code.as_ref().map(|code| code.original_bytes()),
            Some(Bytes::from_static(&[0xFE])),
            "marker bytecode is only written with the first role change"
        );
    }

    #[test]
    fn mint_credits_journal_balance() {
        let (mut journal, block_env) = setup_context();
        let precompile = EvmAllowListPrecompile::new(
            "contractNativeMinterConfig",
            Arc::new(native_minter()),
            ForkSchedule::all_active(),
        );
        {
            let mut internals = EvmInternals::new(&mut journal, &block_env);
            let mut state = JournalState {
                internals: &mut internals,
                precompile: NATIVE_MINTER_ADDRESS,
            };
            ev_allowlist::set_status(&mut state, NATIVE_MINTER_ADDRESS, ADMIN, Role::Enabled)
                .unwrap();
        }

        let calldata = INativeMinter::mintNativeCoinCall {
            addr: USER,
            amount: U256::from(42u64),
        }
        .abi_encode();
        run_call(&mut journal, &block_env, &precompile, ADMIN, &calldata).expect("mint succeeds");

        let account = journal.inner.state.get(&USER).expect("recipient loaded");
        assert_eq!(account.info.balance, U256::from(42u64));
        assert!(account.is_touched(), "recipient account should be touched");
        let log = journal.inner.logs.last().expect("mint logged");
        assert_eq!(log.topics()[0], INativeMinter::NativeCoinMinted::SIGNATURE_HASH);
    }

    #[test]
    fn installs_only_active_precompiles() {
        let registry = PrecompileRegistry::new(PrecompileSettings {
            fork_schedule: ForkSchedule::all_active(),
            precompile_upgrades: vec![PrecompileUpgrade::TxAllowListConfig(
                AllowListPrecompileConfig::enable_at(
                    10,
                    AllowListConfig {
                        admin_addresses: vec![ADMIN],
                        ..Default::default()
                    },
                ),
            )],
        })
        .unwrap();

        let mut before = PrecompilesMap::from_static(Precompiles::prague());
        install_allow_list_precompiles(&mut before, &registry, 9);
        assert!(before.get(&TX_ALLOW_LIST_ADDRESS).is_none());

        let mut after = PrecompilesMap::from_static(Precompiles::prague());
        install_allow_list_precompiles(&mut after, &registry, 10);
        assert!(after.get(&TX_ALLOW_LIST_ADDRESS).is_some());
    }
}
