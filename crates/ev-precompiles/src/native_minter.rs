//! Native coin minter.
//!
//! Accounts holding at least [`Role::Enabled`](ev_allowlist::Role::Enabled) may create native coin out of
//! thin air with `mintNativeCoin(address,uint256)`. Roles are managed through
//! the shared allow-list functions.

use alloy_primitives::{address, Address, Bytes, Log, U256};
use alloy_sol_types::{sol, SolEvent};
use ev_allowlist::{
    abi::{decode_words, word_to_address},
    allow_list_functions,
    gas::{deduct_gas, LOG_DATA_GAS, LOG_GAS, LOG_TOPIC_GAS},
    get_status, AllowListGasSchedule, CallFrame, ContractError, ExecutionContext, Hardfork,
    Mutability, PrecompileFunction, RunOutput, RunResult, StatefulPrecompiledContract,
};

sol! {
    /// Native coin minting interface.
    interface INativeMinter {
        /// `amount` of native coin was minted to `recipient` by `sender`.
        event NativeCoinMinted(address indexed sender, address indexed recipient, uint256 amount);

        /// Mint `amount` to `addr`.
        function mintNativeCoin(address addr, uint256 amount) external;
    }
}

/// Address of the native minter precompile.
pub const NATIVE_MINTER_ADDRESS: Address = address!("0x0200000000000000000000000000000000000001");

/// Fixed cost of `mintNativeCoin`: one balance write plus the caller's role read.
pub const MINT_GAS_COST: u64 = 30_000;

/// Extra cost of a `NativeCoinMinted` log: signature, sender and recipient
/// topics plus one data word.
pub const NATIVE_COIN_MINTED_EVENT_GAS_COST: u64 = LOG_GAS + 3 * LOG_TOPIC_GAS + 32 * LOG_DATA_GAS;

/// Gas schedule of the native minter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMinterGas {
    /// Costs of the allow-list functions.
    pub allow_list: AllowListGasSchedule,
    /// Cost of `mintNativeCoin`.
    pub mint: u64,
    /// Surcharge for the mint log once events are active.
    pub minted_event: u64,
}

impl Default for NativeMinterGas {
    fn default() -> Self {
        Self {
            allow_list: AllowListGasSchedule::default(),
            mint: MINT_GAS_COST,
            minted_event: NATIVE_COIN_MINTED_EVENT_GAS_COST,
        }
    }
}

impl AsRef<AllowListGasSchedule> for NativeMinterGas {
    fn as_ref(&self) -> &AllowListGasSchedule {
        &self.allow_list
    }
}

/// Builds the native minter contract with the default gas schedule.
pub fn native_minter() -> StatefulPrecompiledContract<NativeMinterGas> {
    let mut functions = allow_list_functions::<NativeMinterGas>();
    functions.push(PrecompileFunction::new::<INativeMinter::mintNativeCoinCall>(
        Mutability::Mutating,
        mint_cost,
        mint_native_coin,
    ));
    StatefulPrecompiledContract::new(NATIVE_MINTER_ADDRESS, NativeMinterGas::default(), functions)
}

const fn mint_cost(gas: &NativeMinterGas) -> u64 {
    gas.mint
}

fn mint_native_coin(
    gas: &NativeMinterGas,
    ctx: &mut ExecutionContext<'_>,
    frame: &CallFrame<'_>,
    remaining: u64,
) -> RunResult {
    let [recipient, amount] = decode_words::<2>(frame.input).map_err(|err| err.with_gas(remaining))?;
    let recipient = word_to_address(recipient).map_err(|err| err.with_gas(remaining))?;
    let amount = U256::from_be_bytes(amount.0);

    let caller_role = get_status(&mut *ctx.state, frame.address, frame.caller)
        .map_err(|err| err.with_gas(remaining))?;
    if !caller_role.is_enabled() {
        tracing::warn!(target: "native_minter", caller = ?frame.caller, %caller_role, "mint denied");
        return Err(ContractError::NotEnabled {
            caller: frame.caller,
        }
        .with_gas(remaining));
    }

    let emit_event = ctx.is_fork_active(Hardfork::AllowListEvents);
    let remaining = if emit_event {
        deduct_gas(remaining, gas.minted_event)?
    } else {
        remaining
    };

    ctx.state
        .add_balance(recipient, amount)
        .map_err(|err| ContractError::from(err).with_gas(remaining))?;
    if emit_event {
        ctx.state
            .add_log(minted_log(frame.address, frame.caller, recipient, amount));
    }

    tracing::info!(
        target: "native_minter",
        caller = ?frame.caller,
        ?recipient,
        %amount,
        "minted native coin"
    );
    Ok(RunOutput::new(Bytes::new(), remaining))
}

fn minted_log(precompile: Address, sender: Address, recipient: Address, amount: U256) -> Log {
    let event = INativeMinter::NativeCoinMinted {
        sender,
        recipient,
        amount,
    };
    Log {
        address: precompile,
        data: event.encode_log_data(),
    }
}
