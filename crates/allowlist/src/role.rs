//! The role lattice that gates every allow-list precompile.

use crate::error::InvalidRole;
use alloy_primitives::{B256, U256};
use std::fmt;

/// Permission level an account holds on one precompile.
///
/// Discriminants are the on-chain encoding and follow declaration order, not
/// privilege: [`Role::Manager`] sits above [`Role::Admin`] numerically but
/// holds less authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Role {
    /// No permissions. Also what an untouched storage slot decodes to.
    #[default]
    None = 0,
    /// May call the gated functions of the precompile.
    Enabled = 1,
    /// May call the gated functions and assign any role to anyone.
    Admin = 2,
    /// May call the gated functions and move accounts between
    /// [`Role::None`] and [`Role::Enabled`].
    Manager = 3,
}

impl Role {
    /// First raw value that does not name a role.
    pub const INVALID_THRESHOLD: u64 = 4;

    /// All roles in encoding order.
    pub const ALL: [Self; 4] = [Self::None, Self::Enabled, Self::Admin, Self::Manager];

    /// Returns true if `value` is the encoding of a defined role.
    pub const fn is_valid_value(value: u64) -> bool {
        value < Self::INVALID_THRESHOLD
    }

    /// Returns true if the holder may invoke the non-administrative functions.
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns true for [`Role::Admin`].
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns true for [`Role::Manager`].
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Manager)
    }

    /// Returns true if a caller holding `self` may move an account from
    /// `from` to `target`.
    ///
    /// Admins may perform any transition. Managers may only toggle between
    /// [`Role::None`] and [`Role::Enabled`]; since a manager's own slot holds
    /// [`Role::Manager`], this also rules out a manager demoting itself.
    pub const fn can_modify(self, from: Self, target: Self) -> bool {
        match self {
            Self::Admin => true,
            Self::Manager => {
                matches!(from, Self::None | Self::Enabled)
                    && matches!(target, Self::None | Self::Enabled)
            }
            Self::None | Self::Enabled => false,
        }
    }

    /// Raw integer encoding.
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    /// The 32-byte big-endian word used in storage and ABI output.
    pub fn to_word(self) -> B256 {
        B256::from(U256::from(self.as_u64()))
    }

    /// Decodes a storage or ABI word, rejecting anything outside the four roles.
    pub fn from_word(word: B256) -> Result<Self, InvalidRole> {
        Self::try_from(U256::from_be_bytes(word.0))
    }

    /// Name of the ABI function that assigns this role.
    pub const fn setter_function_name(self) -> &'static str {
        match self {
            Self::None => "setNone",
            Self::Enabled => "setEnabled",
            Self::Admin => "setAdmin",
            Self::Manager => "setManager",
        }
    }
}

impl TryFrom<u64> for Role {
    type Error = InvalidRole;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Enabled),
            2 => Ok(Self::Admin),
            3 => Ok(Self::Manager),
            _ => Err(InvalidRole(U256::from(value))),
        }
    }
}

impl TryFrom<U256> for Role {
    type Error = InvalidRole;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        // Values wider than a u64 are rejected outright, never truncated.
        let small: u64 = value.try_into().map_err(|_| InvalidRole(value))?;
        Self::try_from(small)
    }
}

impl From<Role> for U256 {
    fn from(role: Role) -> Self {
        Self::from(role.as_u64())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NoRole",
            Self::Enabled => "Enabled",
            Self::Admin => "Admin",
            Self::Manager => "Manager",
        })
    }
}
