//! # Allow-List Core
//!
//! Role-based permissioning for stateful precompiles.
//!
//! Every gated precompile keeps a per-account [`Role`] in its own storage and
//! exposes the same five functions for managing it. This crate holds the
//! pieces those precompiles share:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`role`] | The role lattice and who may change what |
//! | [`storage`] | One slot per account, keyed by the account address |
//! | [`config`] | Genesis/upgrade role lists, their validation and canonical hash |
//! | [`contract`] | Selector-routed dispatch with fixed gas and fork gating |
//! | [`allow_list`] | `setAdmin`, `setManager`, `setEnabled`, `setNone`, `readAllowList` |
//! | [`events`] | Role-change log entries |
//!
//! The crate does not depend on an EVM. Storage, logs and fork activation are
//! reached through the [`StateDb`] and [`ChainConfig`] traits, bundled per
//! call into an [`ExecutionContext`].
//!
//! ```ignore
//! use ev_allowlist::{allow_list_contract, AllowListGasSchedule, ExecutionContext};
//!
//! let contract = allow_list_contract(address, AllowListGasSchedule::default());
//! let mut ctx = ExecutionContext::new(&mut state, &fork_schedule, block_timestamp);
//! let out = contract.dispatch(&mut ctx, caller, &calldata, gas_limit, is_static)?;
//! ```

pub mod abi;
pub mod allow_list;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod gas;
pub mod role;
pub mod state;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use allow_list::{allow_list_contract, allow_list_functions};
pub use config::{AllowListConfig, CodecError, ConfigError, Upgrade};
pub use contract::{
    CallFrame, Mutability, PrecompileFunction, RunOutput, RunResult, StatefulPrecompile,
    StatefulPrecompiledContract,
};
pub use error::{ContractError, InvalidRole, RunFailure, StateError};
pub use gas::AllowListGasSchedule;
pub use role::Role;
pub use state::{ChainConfig, ExecutionContext, ForkSchedule, Hardfork, StateDb, UpgradeState};
pub use storage::{get_status, set_status};
