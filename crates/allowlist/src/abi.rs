//! Solidity interface of the allow-list functions and events.

use crate::error::ContractError;
use alloy_primitives::{Address, B256};
use alloy_sol_types::sol;

sol! {
    /// Role management interface exposed by every allow-list gated precompile.
    interface IAllowList {
        /// `account` was made an admin by `sender`.
        event AdminAdded(address indexed sender, address indexed account);
        /// `account` was made a manager by `sender`.
        event ManagerAdded(address indexed sender, address indexed account);
        /// `account` was enabled by `sender`.
        event EnabledAdded(address indexed sender, address indexed account);
        /// `account` lost its role, removed by `sender`.
        event RoleRemoved(address indexed sender, address indexed account);

        /// Grant the admin role.
        function setAdmin(address addr) external;
        /// Grant the manager role.
        function setManager(address addr) external;
        /// Grant the enabled role.
        function setEnabled(address addr) external;
        /// Revoke any role.
        function setNone(address addr) external;
        /// Read the role of `addr`.
        function readAllowList(address addr) external view returns (uint256 role);
    }
}

/// Splits an argument payload into exactly `N` ABI words.
pub fn decode_words<const N: usize>(input: &[u8]) -> Result<[B256; N], ContractError> {
    if input.len() != N * 32 {
        return Err(ContractError::MalformedInput(format!(
            "expected {} bytes of arguments, got {}",
            N * 32,
            input.len()
        )));
    }
    let mut words = [B256::ZERO; N];
    for (word, chunk) in words.iter_mut().zip(input.chunks_exact(32)) {
        *word = B256::from_slice(chunk);
    }
    Ok(words)
}

/// Reads a left-padded address out of an ABI word, rejecting dirty padding.
pub fn word_to_address(word: B256) -> Result<Address, ContractError> {
    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(ContractError::MalformedInput(format!(
            "address argument has non-zero padding: {word}"
        )));
    }
    Ok(Address::from_word(word))
}

/// Decodes the single-address payload shared by every allow-list function.
pub fn decode_address_arg(input: &[u8]) -> Result<Address, ContractError> {
    let [word] = decode_words::<1>(input)?;
    word_to_address(word)
}
