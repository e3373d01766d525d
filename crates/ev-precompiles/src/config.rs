//! Precompile activation schedule.
//!
//! Read from the genesis chain-config extras under `allowListPrecompiles`:
//!
//! ```json
//! {
//!   "forkSchedule": { "managerRoleTimestamp": 0, "allowListEventsTimestamp": 0 },
//!   "precompileUpgrades": [
//!     { "txAllowListConfig": { "blockTimestamp": 0, "adminAddresses": ["0x..."] } },
//!     { "txAllowListConfig": { "blockTimestamp": 200, "disable": true } }
//!   ]
//! }
//! ```

use crate::{
    deployer_allowlist::CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS,
    native_minter::NATIVE_MINTER_ADDRESS, tx_allowlist::TX_ALLOW_LIST_ADDRESS,
};
use alloy_genesis::Genesis;
use alloy_primitives::{Address, U256};
use eyre::WrapErr;
use ev_allowlist::{AllowListConfig, ChainConfig, ConfigError, ForkSchedule, StateDb, StateError, Upgrade};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

/// Key of the settings object in the genesis chain-config extras.
pub const GENESIS_EXTRAS_KEY: &str = "allowListPrecompiles";

/// Errors in the precompile schedule. Any of them halts startup.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Genesis extras could not be parsed.
    #[error("invalid allow-list precompile extras in chainspec: {0}")]
    InvalidExtras(#[from] serde_json::Error),
    /// An upgrade has no activation timestamp.
    #[error("precompile upgrade {index} ({name}) has no block timestamp")]
    MissingTimestamp {
        /// Position in `precompileUpgrades`.
        index: usize,
        /// Config key of the upgrade.
        name: &'static str,
    },
    /// Upgrades for one precompile are not in strictly increasing time order.
    #[error("precompile upgrade {index} ({name}) at {timestamp} does not follow previous upgrade at {previous}")]
    UnorderedTimestamp {
        /// Position in `precompileUpgrades`.
        index: usize,
        /// Config key of the upgrade.
        name: &'static str,
        /// Timestamp of the previous upgrade for the same precompile.
        previous: u64,
        /// Timestamp of this upgrade.
        timestamp: u64,
    },
    /// Disabling a precompile that is not enabled, or enabling one that is.
    #[error("precompile upgrade {index} ({name}) must {expected} the precompile")]
    InvalidToggle {
        /// Position in `precompileUpgrades`.
        index: usize,
        /// Config key of the upgrade.
        name: &'static str,
        /// What the upgrade was required to do.
        expected: &'static str,
    },
    /// An enabling config failed its own validation.
    #[error("precompile upgrade {index} ({name}) is invalid: {source}")]
    InvalidConfig {
        /// Position in `precompileUpgrades`.
        index: usize,
        /// Config key of the upgrade.
        name: &'static str,
        /// Underlying violation.
        #[source]
        source: ConfigError,
    },
}

/// Config shared by the two pure allow-list precompiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigJson", into = "ConfigJson")]
pub struct AllowListPrecompileConfig {
    /// Activation of this config.
    pub upgrade: Upgrade,
    /// Roles written on activation.
    pub allow_list: AllowListConfig,
}

impl AllowListPrecompileConfig {
    /// Enables the precompile at `timestamp` with the given roles.
    pub const fn enable_at(timestamp: u64, allow_list: AllowListConfig) -> Self {
        Self {
            upgrade: Upgrade::at(timestamp),
            allow_list,
        }
    }

    /// Disables the precompile at `timestamp`.
    pub fn disable_at(timestamp: u64) -> Self {
        Self {
            upgrade: Upgrade::disable_at(timestamp),
            allow_list: AllowListConfig::default(),
        }
    }
}

/// Config of the native minter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigJson", into = "ConfigJson")]
pub struct NativeMinterConfig {
    /// Activation of this config.
    pub upgrade: Upgrade,
    /// Roles written on activation.
    pub allow_list: AllowListConfig,
    /// Balances credited on activation.
    pub initial_mint: BTreeMap<Address, U256>,
}

/// JSON object of one precompile config. Unknown keys are rejected so a
/// misspelled role list fails startup instead of being dropped.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    disable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    admin_addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    manager_addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    enabled_addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_mint: Option<BTreeMap<Address, U256>>,
}

impl ConfigJson {
    fn new(upgrade: Upgrade, allow_list: AllowListConfig) -> Self {
        Self {
            block_timestamp: upgrade.block_timestamp,
            disable: upgrade.disable,
            admin_addresses: allow_list.admin_addresses,
            manager_addresses: allow_list.manager_addresses,
            enabled_addresses: allow_list.enabled_addresses,
            initial_mint: None,
        }
    }

    fn upgrade(&self) -> Upgrade {
        Upgrade {
            block_timestamp: self.block_timestamp,
            disable: self.disable,
        }
    }

    fn into_allow_list(self) -> AllowListConfig {
        AllowListConfig {
            admin_addresses: self.admin_addresses,
            manager_addresses: self.manager_addresses,
            enabled_addresses: self.enabled_addresses,
        }
    }
}

impl TryFrom<ConfigJson> for AllowListPrecompileConfig {
    type Error = &'static str;

    fn try_from(json: ConfigJson) -> Result<Self, Self::Error> {
        if json.initial_mint.is_some() {
            return Err("initialMint is only accepted by contractNativeMinterConfig");
        }
        Ok(Self {
            upgrade: json.upgrade(),
            allow_list: json.into_allow_list(),
        })
    }
}

impl From<AllowListPrecompileConfig> for ConfigJson {
    fn from(config: AllowListPrecompileConfig) -> Self {
        Self::new(config.upgrade, config.allow_list)
    }
}

impl From<ConfigJson> for NativeMinterConfig {
    fn from(mut json: ConfigJson) -> Self {
        let initial_mint = json.initial_mint.take().unwrap_or_default();
        Self {
            upgrade: json.upgrade(),
            allow_list: json.into_allow_list(),
            initial_mint,
        }
    }
}

impl From<NativeMinterConfig> for ConfigJson {
    fn from(config: NativeMinterConfig) -> Self {
        let mut json = Self::new(config.upgrade, config.allow_list);
        json.initial_mint = (!config.initial_mint.is_empty()).then_some(config.initial_mint);
        json
    }
}

/// One scheduled change to one precompile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrecompileUpgrade {
    /// Transaction allow-list at [`TX_ALLOW_LIST_ADDRESS`].
    TxAllowListConfig(AllowListPrecompileConfig),
    /// Deployer allow-list at [`CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS`].
    ContractDeployerAllowListConfig(AllowListPrecompileConfig),
    /// Native minter at [`NATIVE_MINTER_ADDRESS`].
    ContractNativeMinterConfig(NativeMinterConfig),
}

impl PrecompileUpgrade {
    /// Config key, as it appears in JSON.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TxAllowListConfig(_) => "txAllowListConfig",
            Self::ContractDeployerAllowListConfig(_) => "contractDeployerAllowListConfig",
            Self::ContractNativeMinterConfig(_) => "contractNativeMinterConfig",
        }
    }

    /// Address of the precompile this upgrade targets.
    pub const fn address(&self) -> Address {
        match self {
            Self::TxAllowListConfig(_) => TX_ALLOW_LIST_ADDRESS,
            Self::ContractDeployerAllowListConfig(_) => CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS,
            Self::ContractNativeMinterConfig(_) => NATIVE_MINTER_ADDRESS,
        }
    }

    /// Activation timestamp and direction.
    pub const fn upgrade(&self) -> &Upgrade {
        match self {
            Self::TxAllowListConfig(config) | Self::ContractDeployerAllowListConfig(config) => {
                &config.upgrade
            }
            Self::ContractNativeMinterConfig(config) => &config.upgrade,
        }
    }

    /// Roles written on activation.
    pub const fn allow_list(&self) -> &AllowListConfig {
        match self {
            Self::TxAllowListConfig(config) | Self::ContractDeployerAllowListConfig(config) => {
                &config.allow_list
            }
            Self::ContractNativeMinterConfig(config) => &config.allow_list,
        }
    }

    /// Returns true if the upgrade switches the precompile off.
    pub const fn is_disable(&self) -> bool {
        self.upgrade().disable
    }

    /// Validates the role lists against the fork schedule.
    pub fn verify(&self, chain_config: &dyn ChainConfig) -> Result<(), ConfigError> {
        self.allow_list().verify(chain_config, self.upgrade())
    }

    /// Applies the config to state: initial mints first, then roles.
    pub fn configure<S>(&self, state: &mut S) -> Result<(), StateError>
    where
        S: StateDb + ?Sized,
    {
        if let Self::ContractNativeMinterConfig(config) = self {
            for (account, amount) in &config.initial_mint {
                state.add_balance(*account, *amount)?;
                tracing::info!(target: "native_minter", ?account, %amount, "initial mint");
            }
        }
        self.allow_list().configure(state, self.address())
    }
}

/// Fork schedule and precompile upgrades of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecompileSettings {
    /// Activation of the allow-list forks.
    #[serde(default)]
    pub fork_schedule: ForkSchedule,
    /// Upgrades in activation order per precompile.
    #[serde(default)]
    pub precompile_upgrades: Vec<PrecompileUpgrade>,
}

impl PrecompileSettings {
    /// Reads and verifies the settings from genesis extras.
    ///
    /// A genesis without the key yields empty settings: no precompile is ever
    /// active.
    pub fn from_genesis(genesis: &Genesis) -> Result<Self, SettingsError> {
        let Some(extras) = genesis
            .config
            .extra_fields
            .get_deserialized::<Self>(GENESIS_EXTRAS_KEY)
        else {
            return Ok(Self::default());
        };
        let settings = extras?;
        settings.verify()?;
        Ok(settings)
    }

    /// Reads and verifies the settings from a standalone JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read precompile settings {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("failed to parse precompile settings {}", path.display()))?;
        settings.verify()?;
        Ok(settings)
    }

    /// Checks the schedule as a whole.
    ///
    /// Every upgrade needs a timestamp, upgrades of one precompile strictly
    /// increase in time and alternate between enabling and disabling
    /// (starting with enabling), and every enabling config is valid.
    pub fn verify(&self) -> Result<(), SettingsError> {
        // Last timestamp and enabled flag per precompile.
        let mut last: BTreeMap<Address, (u64, bool)> = BTreeMap::new();
        for (index, upgrade) in self.precompile_upgrades.iter().enumerate() {
            let name = upgrade.name();
            let timestamp = upgrade
                .upgrade()
                .block_timestamp
                .ok_or(SettingsError::MissingTimestamp { index, name })?;
            let disable = upgrade.is_disable();

            let (previous, enabled) = match last.get(&upgrade.address()) {
                Some(&(previous, enabled)) => (Some(previous), enabled),
                None => (None, false),
            };
            if let Some(previous) = previous {
                if timestamp <= previous {
                    return Err(SettingsError::UnorderedTimestamp {
                        index,
                        name,
                        previous,
                        timestamp,
                    });
                }
            }
            if disable != enabled {
                return Err(SettingsError::InvalidToggle {
                    index,
                    name,
                    expected: if enabled { "disable" } else { "enable" },
                });
            }
            if !disable {
                upgrade
                    .verify(&self.fork_schedule)
                    .map_err(|source| SettingsError::InvalidConfig { index, name, source })?;
            }
            last.insert(upgrade.address(), (timestamp, !disable));
        }
        Ok(())
    }
}
