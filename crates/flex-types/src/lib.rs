//! # flex-types
//!
//! Shared domain types used across the FLEX payout workspace: addresses,
//! 256-bit token amounts, block heights, epoch indices and the contract
//! event log.

pub mod events;

pub use alloy_primitives::{Address, U256};

/// Token amount in base units (1 FLEX = 10^18 base units).
pub type Amount = U256;

/// Block height on the serial ledger.
pub type BlockHeight = u64;

/// Zero-based epoch index.
pub type EpochIndex = u64;

/// Decimal places of the FLEX token.
pub const FLEX_DECIMALS: u8 = 18;

/// Base units per FLEX.
pub const BASE_UNITS_PER_FLEX: u64 = 1_000_000_000_000_000_000;

/// Target block time in seconds.
pub const BLOCK_TIME_SECS: u64 = 5;

/// Blocks per daily epoch (86 400 s / 5 s).
pub const DAILY_EPOCH_BLOCKS: u64 = 24 * 60 * 60 / BLOCK_TIME_SECS;

/// Blocks per quarterly epoch (13 weeks).
pub const QUARTERLY_EPOCH_BLOCKS: u64 = 13 * 7 * DAILY_EPOCH_BLOCKS;

/// Convert a whole number of FLEX into base units.
pub fn flex(whole: u64) -> Amount {
    U256::from(whole) * U256::from(BASE_UNITS_PER_FLEX)
}

/// Derive a stable account address from a human-readable label.
///
/// Used by the simulator and tests to name accounts ("admin", "alice").
pub fn named_account(label: &str) -> Address {
    Address::from_word(alloy_primitives::keccak256(label.as_bytes()))
}

/// Address of a contract deployed by `deployer` with the given nonce,
/// following the EVM `CREATE` rule.
pub fn contract_address(deployer: Address, nonce: u64) -> Address {
    deployer.create(nonce)
}
