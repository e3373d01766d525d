//! # Allow-List Precompiles
//!
//! Permissioned precompiled contracts for ev-reth chains, built on the
//! role-based allow-list core in [`ev_allowlist`].
//!
//! ## Available Precompiles
//!
//! | Address | Name | Description |
//! |---------|------|-------------|
//! | `0x0200…0000` | [`deployer_allowlist`] | Who may create contracts |
//! | `0x0200…0001` | [`native_minter`] | Who may mint native coin, and `mintNativeCoin` |
//! | `0x0200…0002` | [`tx_allowlist`] | Who may submit transactions |
//!
//! Every precompile exposes `setAdmin`, `setManager`, `setEnabled`, `setNone`
//! and `readAllowList` over its own role storage.
//!
//! ## Activation
//!
//! Precompiles are switched on and off at block timestamps listed in the
//! genesis extras (see [`config`]). A [`PrecompileRegistry`] built at startup
//! owns the contracts, applies each config as it activates, and answers the
//! transaction and deployment gates.
//!
//! ## Integration
//!
//! The precompiles cannot see whether their frame is static, so EVMs running
//! them also carry a [`StaticCallGate`] inspector that rejects state-changing
//! calls from static frames.
//!
//! ```ignore
//! use ev_precompiles::{
//!     install_allow_list_precompiles, PrecompileRegistry, PrecompileSettings, StaticCallGate,
//! };
//!
//! let registry = Arc::new(PrecompileRegistry::new(PrecompileSettings::from_genesis(&genesis)?)?);
//! registry.apply_activations(parent_timestamp, block_timestamp, &mut state)?;
//! install_allow_list_precompiles(&mut precompiles, &registry, block_timestamp);
//! let inspector = StaticCallGate::new(Arc::clone(&registry));
//! ```

pub mod config;
pub mod deployer_allowlist;
pub mod evm;
pub mod inspector_gate;
pub mod native_minter;
pub mod registry;
pub mod tx_allowlist;

pub use config::{
    AllowListPrecompileConfig, NativeMinterConfig, PrecompileSettings, PrecompileUpgrade,
    SettingsError,
};
pub use evm::{install_allow_list_precompiles, EvmAllowListPrecompile};
pub use inspector_gate::StaticCallGate;
pub use registry::PrecompileRegistry;
