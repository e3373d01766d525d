//! Genesis and upgrade configuration of an allow-list.

use crate::{
    error::StateError,
    state::{ChainConfig, Hardfork, StateDb},
    storage::set_status,
    Role,
};
use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const ADDRESS_LEN: usize = 20;

/// Violations detected by [`AllowListConfig::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An address repeats within `enabledAddresses`.
    #[error("duplicate address {0} in enabled list")]
    DuplicateEnabled(Address),
    /// An address repeats within `adminAddresses`.
    #[error("duplicate address {0} in admin list")]
    DuplicateAdmin(Address),
    /// An address is listed as both admin and enabled.
    #[error("cannot set address {0} as both admin and enabled")]
    AdminAndEnabled(Address),
    /// Managers are configured before the manager role exists.
    #[error("cannot set managers before manager role activation (upgrade timestamp {timestamp})")]
    ManagersBeforeActivation {
        /// Timestamp the upgrade takes effect.
        timestamp: u64,
    },
    /// An address repeats within `managerAddresses`.
    #[error("duplicate address {0} in manager list")]
    DuplicateManager(Address),
    /// An address is listed as both admin and manager.
    #[error("cannot set address {0} as both admin and manager")]
    AdminAndManager(Address),
    /// An address is listed as both enabled and manager.
    #[error("cannot set address {0} as both enabled and manager")]
    EnabledAndManager(Address),
}

/// Malformed canonical binary form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The stream ended before the declared content.
    #[error("truncated allow-list config: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Offset the read started at.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the stream.
        available: usize,
    },
    /// Bytes remain after the last list.
    #[error("{0} trailing bytes after allow-list config")]
    TrailingBytes(usize),
    /// A declared count cannot be represented in memory.
    #[error("address count {0} overflows")]
    CountOverflow(u32),
    /// A list holds more addresses than a `u32` count can declare.
    #[error("address list of length {0} does not fit a u32 count")]
    ListTooLong(usize),
}

/// When an upgrade takes effect and whether it switches the precompile off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    /// Activation timestamp. `None` only for configs not yet scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_timestamp: Option<u64>,
    /// Disables the precompile instead of configuring it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable: bool,
}

impl Upgrade {
    /// An enabling upgrade at `timestamp`.
    pub const fn at(timestamp: u64) -> Self {
        Self {
            block_timestamp: Some(timestamp),
            disable: false,
        }
    }

    /// A disabling upgrade at `timestamp`.
    pub const fn disable_at(timestamp: u64) -> Self {
        Self {
            block_timestamp: Some(timestamp),
            disable: true,
        }
    }
}

/// Initial role holders of an allow-list.
///
/// Equality is positional: two configs listing the same addresses in a
/// different order are not equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListConfig {
    /// Accounts granted [`Role::Admin`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_addresses: Vec<Address>,
    /// Accounts granted [`Role::Manager`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manager_addresses: Vec<Address>,
    /// Accounts granted [`Role::Enabled`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_addresses: Vec<Address>,
}

impl AllowListConfig {
    /// Checks the lists for duplicates and overlaps, and that managers are
    /// only configured once the manager role is active.
    ///
    /// Lists are walked in the order enabled, admin, manager, each entry
    /// checked against every address seen before it, so the first violation
    /// returned is the first one in list order.
    pub fn verify(&self, chain_config: &dyn ChainConfig, upgrade: &Upgrade) -> Result<(), ConfigError> {
        let mut seen: HashMap<Address, Role> = HashMap::with_capacity(
            self.enabled_addresses.len() + self.admin_addresses.len() + self.manager_addresses.len(),
        );

        for address in &self.enabled_addresses {
            if seen.insert(*address, Role::Enabled).is_some() {
                return Err(ConfigError::DuplicateEnabled(*address));
            }
        }

        for address in &self.admin_addresses {
            match seen.insert(*address, Role::Admin) {
                Some(Role::Admin) => return Err(ConfigError::DuplicateAdmin(*address)),
                Some(_) => return Err(ConfigError::AdminAndEnabled(*address)),
                None => {}
            }
        }

        if self.manager_addresses.is_empty() {
            return Ok(());
        }
        if let Some(timestamp) = upgrade.block_timestamp {
            if !chain_config.is_fork_active(Hardfork::ManagerRole, timestamp) {
                return Err(ConfigError::ManagersBeforeActivation { timestamp });
            }
        }
        for address in &self.manager_addresses {
            match seen.insert(*address, Role::Manager) {
                Some(Role::Manager) => return Err(ConfigError::DuplicateManager(*address)),
                Some(Role::Admin) => return Err(ConfigError::AdminAndManager(*address)),
                Some(_) => return Err(ConfigError::EnabledAndManager(*address)),
                None => {}
            }
        }
        Ok(())
    }

    /// Writes every listed role into the precompile's storage.
    ///
    /// Enabled accounts are written first, then admins, then managers.
    pub fn configure<S>(&self, state: &mut S, precompile: Address) -> Result<(), StateError>
    where
        S: StateDb + ?Sized,
    {
        let grants = [
            (Role::Enabled, &self.enabled_addresses),
            (Role::Admin, &self.admin_addresses),
            (Role::Manager, &self.manager_addresses),
        ];
        for (role, addresses) in grants {
            for address in addresses {
                set_status(state, precompile, *address, role)?;
            }
        }
        tracing::debug!(
            target: "allowlist::config",
            ?precompile,
            enabled = self.enabled_addresses.len(),
            admins = self.admin_addresses.len(),
            managers = self.manager_addresses.len(),
            "allow list configured"
        );
        Ok(())
    }

    /// Returns true if no role is granted.
    pub fn is_empty(&self) -> bool {
        self.admin_addresses.is_empty()
            && self.manager_addresses.is_empty()
            && self.enabled_addresses.is_empty()
    }

    /// Encodes the config in its canonical binary form: admin, manager and
    /// enabled lists, each a big-endian `u32` count followed by its addresses
    /// in ascending byte order.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let total = self.admin_addresses.len()
            + self.manager_addresses.len()
            + self.enabled_addresses.len();
        let mut out = Vec::with_capacity(3 * 4 + total * ADDRESS_LEN);
        for list in [
            &self.admin_addresses,
            &self.manager_addresses,
            &self.enabled_addresses,
        ] {
            let mut sorted = list.clone();
            sorted.sort_unstable();
            out.extend_from_slice(&encode_count(sorted.len())?);
            for address in &sorted {
                out.extend_from_slice(address.as_slice());
            }
        }
        Ok(out)
    }

    /// Decodes the canonical binary form.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader { bytes, offset: 0 };
        let admin_addresses = reader.address_list()?;
        let manager_addresses = reader.address_list()?;
        let enabled_addresses = reader.address_list()?;
        let rest = bytes.len() - reader.offset;
        if rest != 0 {
            return Err(CodecError::TrailingBytes(rest));
        }
        Ok(Self {
            admin_addresses,
            manager_addresses,
            enabled_addresses,
        })
    }

    /// Keccak-256 of the canonical binary form.
    pub fn hash(&self) -> Result<B256, CodecError> {
        self.to_canonical_bytes().map(keccak256)
    }
}

fn encode_count(len: usize) -> Result<[u8; 4], CodecError> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| CodecError::ListTooLong(len))
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let available = self.bytes.len() - self.offset;
        if needed > available {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }
        let chunk = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(chunk)
    }

    fn address_list(&mut self) -> Result<Vec<Address>, CodecError> {
        let mut count = [0u8; 4];
        count.copy_from_slice(self.take(4)?);
        let count = u32::from_be_bytes(count);
        let len = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(ADDRESS_LEN))
            .ok_or(CodecError::CountOverflow(count))?;
        Ok(self
            .take(len)?
            .chunks_exact(ADDRESS_LEN)
            .map(Address::from_slice)
            .collect())
    }
}
