//! Error types shared by the allow-list core.

use crate::Role;
use alloy_primitives::{Address, Selector, U256};
use std::fmt;
use thiserror::Error;

/// A raw value that does not name one of the defined [`Role`]s.
///
/// Raised at every conversion boundary instead of falling back to
/// [`Role::None`], so a corrupted slot or a hostile input hard-fails rather
/// than silently dropping permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct InvalidRole(pub U256);

/// Failure reported by the backing state store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("state access failed: {0}")]
pub struct StateError(String);

impl StateError {
    /// Wraps any displayable database error.
    pub fn new(err: impl fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// Errors returned by a stateful precompile call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A role value read from storage or input was out of range.
    #[error(transparent)]
    InvalidRole(#[from] InvalidRole),
    /// The caller's role does not permit the requested transition.
    #[error("cannot modify allow list: {caller} ({caller_role}) may not move {target} from {from} to {to}")]
    CannotModifyAllowList {
        /// Address that attempted the change.
        caller: Address,
        /// Role held by the caller.
        caller_role: Role,
        /// Account whose role was to change.
        target: Address,
        /// Target's role before the call.
        from: Role,
        /// Role requested for the target.
        to: Role,
    },
    /// The caller must hold at least [`Role::Enabled`] for this function.
    #[error("non-enabled caller {caller}")]
    NotEnabled {
        /// Address that attempted the call.
        caller: Address,
    },
    /// Supplied gas did not cover the function cost.
    #[error("out of gas")]
    OutOfGas,
    /// A mutating function was invoked from a static context.
    #[error("write protection")]
    WriteProtection,
    /// The selector is registered but gated behind a fork that is not active yet.
    #[error("invalid non-activated function selector {0}")]
    FunctionNotActive(Selector),
    /// No function is registered under the selector.
    #[error("invalid function selector {0}")]
    UnknownSelector(Selector),
    /// Payload length or shape does not match the function signature.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// The backing state store failed.
    #[error(transparent)]
    State(#[from] StateError),
}

impl ContractError {
    /// Attaches the gas left at the point of failure.
    pub fn with_gas(self, remaining_gas: u64) -> RunFailure {
        RunFailure {
            error: self,
            remaining_gas,
        }
    }
}

/// A failed call together with the gas that was not consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// What went wrong.
    pub error: ContractError,
    /// Gas left when the call stopped. Zero after [`ContractError::OutOfGas`].
    pub remaining_gas: u64,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (remaining gas {})", self.error, self.remaining_gas)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
