//! # flex-distributor
//!
//! Reward forwarding contract.
//!
//! A [`Distributor`] accumulates FLEX sent to its address and, when an
//! authorized delegatee triggers it, forwards its whole balance into the
//! configured payout engine's current epoch. It never keeps reward
//! accounting of its own.
//!
//! ## Modules
//!
//! - [`distributor`] — The distributor contract

pub mod distributor;

pub use distributor::Distributor;

use flex_ledger::LedgerError;
use flex_payout::PayoutError;
use flex_types::Address;

/// Error types for distributor operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributorError {
    /// Caller is not the admin.
    #[error("caller is not the admin")]
    NotAdmin,

    /// Caller is neither admin nor a delegatee.
    #[error("You are not the admin or valid delegatee")]
    NotDelegatee,

    /// Nothing is held to forward.
    #[error("You must transfer more than zero FLEX")]
    ZeroBalance,

    /// Revert destination is the null address.
    #[error("address to transfer to cannot be null")]
    NullRecipient,

    /// Revert amount is larger than the held balance.
    #[error("amount exceeds distributor balance")]
    ExceedsBalance,

    /// Revert requested with nothing held.
    #[error("no balance to revert")]
    NoBalance,

    /// Revert requested for zero tokens.
    #[error("revert amount must be greater than zero")]
    ZeroAmount,

    /// Null address where a real account or contract is required.
    #[error("address cannot be null")]
    ZeroAddress,

    /// The sink handed in is not the configured payout engine.
    #[error("payout address mismatch: configured {expected}, got {actual}")]
    PayoutMismatch {
        /// Configured payout engine.
        expected: Address,
        /// Address of the sink supplied.
        actual: Address,
    },

    /// The payout engine rejected the deposit.
    #[error("payout error: {0}")]
    Payout(#[from] PayoutError),

    /// Token ledger rejected a transfer.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for distributor operations.
pub type Result<T> = std::result::Result<T, DistributorError>;
