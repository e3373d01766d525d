//! Role-change log entries.
//!
//! A successful transition appends one entry with topics
//! `[signature, caller, target]` and empty data, but only once
//! [`crate::Hardfork::AllowListEvents`] is active. Before that the same
//! transition happens silently.

use crate::{abi::IAllowList, Role};
use alloy_primitives::{Address, Bytes, Log, B256};
use alloy_sol_types::SolEvent;

/// Semantic kind of a role transition, named after the event it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// Target became [`Role::Admin`].
    AdminAdded,
    /// Target became [`Role::Manager`].
    ManagerAdded,
    /// Target became [`Role::Enabled`].
    EnabledAdded,
    /// Target became [`Role::None`].
    RoleRemoved,
}

impl RoleChange {
    /// Classifies a transition by the role being assigned.
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminAdded,
            Role::Manager => Self::ManagerAdded,
            Role::Enabled => Self::EnabledAdded,
            Role::None => Self::RoleRemoved,
        }
    }

    /// Keccak-256 of the event signature, the first log topic.
    pub const fn signature_hash(self) -> B256 {
        match self {
            Self::AdminAdded => IAllowList::AdminAdded::SIGNATURE_HASH,
            Self::ManagerAdded => IAllowList::ManagerAdded::SIGNATURE_HASH,
            Self::EnabledAdded => IAllowList::EnabledAdded::SIGNATURE_HASH,
            Self::RoleRemoved => IAllowList::RoleRemoved::SIGNATURE_HASH,
        }
    }
}

/// Builds the log entry for `caller` moving `target` into `role` on the
/// precompile at `precompile`.
pub fn role_change_log(precompile: Address, role: Role, caller: Address, target: Address) -> Log {
    Log::new_unchecked(
        precompile,
        vec![
            RoleChange::for_role(role).signature_hash(),
            caller.into_word(),
            target.into_word(),
        ],
        Bytes::new(),
    )
}
