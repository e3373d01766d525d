//! Selector-routed dispatch for stateful precompiles.
//!
//! A call walks through a fixed sequence of checkpoints:
//!
//! 1. **Routing**: the 4-byte selector must name a registered function.
//! 2. **Activation**: a function gated on a [`Hardfork`] is rejected, free of
//!    charge, until the fork is active at the current block.
//! 3. **Gas**: the function's fixed cost is deducted; running short ends the
//!    call with zero gas left and no state touched.
//! 4. **Read-only**: mutating functions are rejected in a static context,
//!    after the gas above has been consumed.
//! 5. **Handler**: the function body runs with the remaining gas.

use crate::{
    error::{ContractError, RunFailure},
    gas::deduct_gas,
    state::{ChainConfig, ExecutionContext, Hardfork},
};
use alloy_primitives::{Address, Bytes, Selector};
use alloy_sol_types::SolCall;
use std::fmt;

/// Outcome of a call into a stateful precompile.
pub type RunResult = Result<RunOutput, RunFailure>;

/// Function body. Receives the contract payload, the call's capabilities,
/// the call frame and the gas left after the fixed cost.
pub type RunFn<T> = fn(&T, &mut ExecutionContext<'_>, &CallFrame<'_>, u64) -> RunResult;

/// Successful return data and the gas not consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// ABI-encoded return data.
    pub output: Bytes,
    /// Gas left over.
    pub remaining_gas: u64,
}

impl RunOutput {
    /// Builds a successful output.
    pub fn new(output: impl Into<Bytes>, remaining_gas: u64) -> Self {
        Self {
            output: output.into(),
            remaining_gas,
        }
    }
}

/// Per-call parameters handed to a function body.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame<'a> {
    /// Address of the precompile; its storage namespace.
    pub address: Address,
    /// Immediate caller.
    pub caller: Address,
    /// Arguments after the selector.
    pub input: &'a [u8],
    /// Whether the call runs in a static context.
    pub read_only: bool,
}

/// Whether a function may change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Reads only; allowed in static calls.
    View,
    /// Writes state; rejected in static calls.
    Mutating,
}

/// A function registered on a [`StatefulPrecompiledContract`].
pub struct PrecompileFunction<T> {
    signature: &'static str,
    selector: Selector,
    mutability: Mutability,
    gas_cost: fn(&T) -> u64,
    activation: Option<Hardfork>,
    run: RunFn<T>,
}

impl<T> PrecompileFunction<T> {
    /// Registers `run` under the selector of the ABI call `C`.
    pub fn new<C: SolCall>(mutability: Mutability, gas_cost: fn(&T) -> u64, run: RunFn<T>) -> Self {
        Self {
            signature: C::SIGNATURE,
            selector: Selector::from(C::SELECTOR),
            mutability,
            gas_cost,
            activation: None,
            run,
        }
    }

    /// Gates the function on `fork` being active.
    pub fn activated_at(mut self, fork: Hardfork) -> Self {
        self.activation = Some(fork);
        self
    }

    /// Canonical ABI signature, e.g. `setAdmin(address)`.
    pub const fn signature(&self) -> &'static str {
        self.signature
    }

    /// Routing selector.
    pub const fn selector(&self) -> Selector {
        self.selector
    }

    /// Whether the function writes state.
    pub const fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Fork the function is gated on, if any.
    pub const fn activation(&self) -> Option<Hardfork> {
        self.activation
    }
}

impl<T> fmt::Debug for PrecompileFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrecompileFunction")
            .field("signature", &self.signature)
            .field("selector", &self.selector)
            .field("mutability", &self.mutability)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

/// A precompile whose functions are routed by selector.
///
/// `T` is the contract payload handed to every function body, typically its
/// gas schedule. The function table is sorted at construction and read-only
/// afterwards.
#[derive(Debug)]
pub struct StatefulPrecompiledContract<T> {
    address: Address,
    inner: T,
    functions: Vec<PrecompileFunction<T>>,
}

impl<T> StatefulPrecompiledContract<T> {
    /// Builds the routing table.
    ///
    /// # Panics
    ///
    /// Panics if two functions share a selector.
    pub fn new(address: Address, inner: T, mut functions: Vec<PrecompileFunction<T>>) -> Self {
        functions.sort_unstable_by_key(|function| function.selector);
        if let Some(pair) = functions
            .windows(2)
            .find(|pair| pair[0].selector == pair[1].selector)
        {
            panic!(
                "duplicate selector {} on precompile {address}: {} and {}",
                pair[0].selector, pair[0].signature, pair[1].signature
            );
        }
        Self {
            address,
            inner,
            functions,
        }
    }

    /// Address of the precompile.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Contract payload.
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    /// Registered functions in selector order.
    pub fn functions(&self) -> &[PrecompileFunction<T>] {
        &self.functions
    }

    /// Looks up the function registered under `selector`.
    pub fn function(&self, selector: Selector) -> Option<&PrecompileFunction<T>> {
        self.functions
            .binary_search_by_key(&selector, |function| function.selector)
            .ok()
            .map(|index| &self.functions[index])
    }

    /// Routes `input` to its function and runs it.
    pub fn dispatch(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: Address,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> RunResult {
        let (function, args, remaining) = self.checkpoint(
            ctx.chain_config,
            ctx.block_timestamp,
            input,
            supplied_gas,
            read_only,
        )?;

        tracing::trace!(
            target: "allowlist::contract",
            precompile = ?self.address,
            function = function.signature,
            ?caller,
            remaining,
            "dispatching"
        );
        let frame = CallFrame {
            address: self.address,
            caller,
            input: args,
            read_only,
        };
        (function.run)(&self.inner, ctx, &frame, remaining)
    }

    /// Runs every checkpoint before the function body: routing, activation,
    /// gas and read-only. None of them touches state.
    ///
    /// Returns the function, its arguments and the gas left for the body.
    fn checkpoint<'i>(
        &self,
        chain_config: &dyn ChainConfig,
        block_timestamp: u64,
        input: &'i [u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> Result<(&PrecompileFunction<T>, &'i [u8], u64), RunFailure> {
        let Some((selector, args)) = input.split_first_chunk::<4>() else {
            return Err(ContractError::MalformedInput("missing function selector".to_string())
                .with_gas(supplied_gas));
        };
        let selector = Selector::from(*selector);

        let Some(function) = self.function(selector) else {
            tracing::debug!(target: "allowlist::contract", precompile = ?self.address, %selector, "unknown selector");
            return Err(ContractError::UnknownSelector(selector).with_gas(supplied_gas));
        };

        if let Some(fork) = function.activation {
            if !chain_config.is_fork_active(fork, block_timestamp) {
                tracing::debug!(
                    target: "allowlist::contract",
                    precompile = ?self.address,
                    function = function.signature,
                    ?fork,
                    timestamp = block_timestamp,
                    "function not active"
                );
                return Err(ContractError::FunctionNotActive(selector).with_gas(supplied_gas));
            }
        }

        let remaining = deduct_gas(supplied_gas, (function.gas_cost)(&self.inner)).inspect_err(|_| {
            tracing::debug!(
                target: "allowlist::contract",
                function = function.signature,
                supplied_gas,
                "out of gas"
            );
        })?;

        if read_only && function.mutability == Mutability::Mutating {
            return Err(ContractError::WriteProtection.with_gas(remaining));
        }

        Ok((function, args, remaining))
    }
}

/// Object-safe view of a stateful precompile, used where contracts with
/// different payloads are held side by side.
pub trait StatefulPrecompile: fmt::Debug + Send + Sync {
    /// Address of the precompile.
    fn address(&self) -> Address;

    /// Routes and runs one call.
    fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: Address,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> RunResult;

    /// Runs the checkpoints that precede the function body without touching
    /// state. `Ok` carries the gas the body would start with; `Err` is the
    /// failure [`StatefulPrecompile::run`] would return for the same call.
    fn precheck(
        &self,
        chain_config: &dyn ChainConfig,
        block_timestamp: u64,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> Result<u64, RunFailure>;
}

impl<T> StatefulPrecompile for StatefulPrecompiledContract<T>
where
    T: fmt::Debug + Send + Sync,
{
    fn address(&self) -> Address {
        self.address
    }

    fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: Address,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> RunResult {
        self.dispatch(ctx, caller, input, supplied_gas, read_only)
    }

    fn precheck(
        &self,
        chain_config: &dyn ChainConfig,
        block_timestamp: u64,
        input: &[u8],
        supplied_gas: u64,
        read_only: bool,
    ) -> Result<u64, RunFailure> {
        self.checkpoint(chain_config, block_timestamp, input, supplied_gas, read_only)
            .map(|(_, _, remaining)| remaining)
    }
}
