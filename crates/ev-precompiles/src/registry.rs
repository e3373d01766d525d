//! Owner of every allow-list precompile instance of a chain.
//!
//! Built once at startup from verified [`PrecompileSettings`]. Answers which
//! config is in force at a given block timestamp, applies configs as they
//! activate, and routes calls to active contracts.

use crate::{
    config::{PrecompileSettings, PrecompileUpgrade, SettingsError},
    deployer_allowlist::{contract_deployer_allow_list, is_deploy_allowed, CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS},
    native_minter::{native_minter, NATIVE_MINTER_ADDRESS},
    tx_allowlist::{is_tx_allowed, tx_allow_list, TX_ALLOW_LIST_ADDRESS},
};
use alloy_primitives::Address;
use ev_allowlist::{
    ContractError, ExecutionContext, ForkSchedule, RunResult, StateDb, StateError,
    StatefulPrecompile, UpgradeState,
};
use std::{collections::BTreeMap, sync::Arc};

/// Scheduled allow-list precompiles of a chain and their contracts.
#[derive(Debug, Clone)]
pub struct PrecompileRegistry {
    fork_schedule: ForkSchedule,
    upgrades: Vec<PrecompileUpgrade>,
    contracts: BTreeMap<Address, Arc<dyn StatefulPrecompile>>,
}

impl PrecompileRegistry {
    /// Verifies `settings` and instantiates one contract per scheduled
    /// precompile.
    pub fn new(settings: PrecompileSettings) -> Result<Self, SettingsError> {
        settings.verify()?;
        let mut contracts: BTreeMap<Address, Arc<dyn StatefulPrecompile>> = BTreeMap::new();
        for upgrade in &settings.precompile_upgrades {
            contracts
                .entry(upgrade.address())
                .or_insert_with(|| contract_for(upgrade));
        }
        tracing::info!(
            target: "precompile_registry",
            upgrades = settings.precompile_upgrades.len(),
            precompiles = contracts.len(),
            "precompile registry initialized"
        );
        Ok(Self {
            fork_schedule: settings.fork_schedule,
            upgrades: settings.precompile_upgrades,
            contracts,
        })
    }

    /// Fork predicates of the chain.
    pub const fn fork_schedule(&self) -> &ForkSchedule {
        &self.fork_schedule
    }

    /// All upgrades in schedule order.
    pub fn upgrades(&self) -> &[PrecompileUpgrade] {
        &self.upgrades
    }

    /// The config in force for `address` at `timestamp`, if the precompile is
    /// enabled then.
    pub fn active_config(&self, address: Address, timestamp: u64) -> Option<&PrecompileUpgrade> {
        self.upgrades
            .iter()
            .filter(|upgrade| upgrade.address() == address)
            .take_while(|upgrade| {
                upgrade
                    .upgrade()
                    .block_timestamp
                    .is_some_and(|activation| activation <= timestamp)
            })
            .last()
            .filter(|upgrade| !upgrade.is_disable())
    }

    /// Returns true if the precompile at `address` is enabled at `timestamp`.
    pub fn is_active(&self, address: Address, timestamp: u64) -> bool {
        self.active_config(address, timestamp).is_some()
    }

    /// Contract registered at `address`, regardless of activation.
    pub fn contract(&self, address: Address) -> Option<&Arc<dyn StatefulPrecompile>> {
        self.contracts.get(&address)
    }

    /// Contracts enabled at `timestamp`.
    pub fn active_contracts(
        &self,
        timestamp: u64,
    ) -> impl Iterator<Item = &Arc<dyn StatefulPrecompile>> + '_ {
        self.contracts
            .iter()
            .filter(move |(address, _)| self.is_active(**address, timestamp))
            .map(|(_, contract)| contract)
    }

    /// Applies every upgrade that activates in the block.
    ///
    /// With a parent, that is every upgrade whose timestamp falls in
    /// `(parent_timestamp, block_timestamp]`. For genesis (`None`), every
    /// upgrade at or before `block_timestamp`. A disabling upgrade wipes the
    /// precompile's storage, so a later enabling config starts from its own
    /// role lists only. Returns the applied upgrades in schedule order.
    pub fn apply_activations<S>(
        &self,
        parent_timestamp: Option<u64>,
        block_timestamp: u64,
        state: &mut S,
    ) -> Result<Vec<&PrecompileUpgrade>, StateError>
    where
        S: UpgradeState + ?Sized,
    {
        let mut applied = Vec::new();
        for upgrade in &self.upgrades {
            let Some(activation) = upgrade.upgrade().block_timestamp else {
                continue;
            };
            let in_block = activation <= block_timestamp
                && parent_timestamp.is_none_or(|parent| activation > parent);
            if !in_block {
                continue;
            }
            if upgrade.is_disable() {
                state.clear_storage(upgrade.address())?;
                tracing::info!(
                    target: "precompile_registry",
                    precompile = ?upgrade.address(),
                    config = upgrade.name(),
                    activation,
                    block_timestamp,
                    "precompile disabled and storage cleared"
                );
            } else {
                upgrade.configure(state)?;
                tracing::info!(
                    target: "precompile_registry",
                    precompile = ?upgrade.address(),
                    config = upgrade.name(),
                    activation,
                    block_timestamp,
                    "precompile config applied"
                );
            }
            applied.push(upgrade);
        }
        Ok(applied)
    }

    /// Runs a call against the precompile at `address` if it is enabled at the
    /// context's block timestamp. `None` means there is no active precompile
    /// there.
    pub fn run(
        &self,
        address: Address,
        ctx: &mut ExecutionContext<'_>,
        caller: Address,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> Option<RunResult> {
        if !self.is_active(address, ctx.block_timestamp) {
            tracing::trace!(target: "precompile_registry", ?address, "no active precompile");
            return None;
        }
        let contract = self.contracts.get(&address)?;
        Some(contract.run(ctx, caller, input, supplied_gas, read_only))
    }

    /// Returns true if `sender` may submit transactions at `timestamp`.
    /// Everyone may while the transaction allow-list is inactive.
    pub fn is_tx_allowed<S>(
        &self,
        state: &mut S,
        timestamp: u64,
        sender: Address,
    ) -> Result<bool, ContractError>
    where
        S: StateDb + ?Sized,
    {
        if !self.is_active(TX_ALLOW_LIST_ADDRESS, timestamp) {
            return Ok(true);
        }
        let allowed = is_tx_allowed(state, sender)?;
        if !allowed {
            tracing::debug!(target: "precompile_registry", ?sender, "transaction sender not allowed");
        }
        Ok(allowed)
    }

    /// Returns true if `deployer` may create contracts at `timestamp`.
    /// Everyone may while the deployer allow-list is inactive.
    pub fn is_deploy_allowed<S>(
        &self,
        state: &mut S,
        timestamp: u64,
        deployer: Address,
    ) -> Result<bool, ContractError>
    where
        S: StateDb + ?Sized,
    {
        if !self.is_active(CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS, timestamp) {
            return Ok(true);
        }
        let allowed = is_deploy_allowed(state, deployer)?;
        if !allowed {
            tracing::debug!(target: "precompile_registry", ?deployer, "deployer not allowed");
        }
        Ok(allowed)
    }
}

fn contract_for(upgrade: &PrecompileUpgrade) -> Arc<dyn StatefulPrecompile> {
    match upgrade {
        PrecompileUpgrade::TxAllowListConfig(_) => Arc::new(tx_allow_list()),
        PrecompileUpgrade::ContractDeployerAllowListConfig(_) => {
            Arc::new(contract_deployer_allow_list())
        }
        PrecompileUpgrade::ContractNativeMinterConfig(_) => Arc::new(native_minter()),
    }
}
