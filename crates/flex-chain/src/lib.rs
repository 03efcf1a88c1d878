//! # flex-chain
//!
//! Serial, single-writer executor for the FLEX contracts.
//!
//! Every transaction mines exactly one block and executes at that block's
//! height. A transaction either commits all of its state changes and events
//! or none of them; a reverted transaction still consumes its block. Views
//! are evaluated at the latest mined height.
//!
//! ## Modules
//!
//! - [`chain`] — Contract registry, transactions and views

pub mod chain;

pub use chain::{Chain, Receipt};

use flex_distributor::DistributorError;
use flex_ledger::LedgerError;
use flex_payout::PayoutError;
use flex_types::{Address, BlockHeight};

/// Error types for chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// No payout engine or distributor is deployed at this address.
    #[error("no contract deployed at {0}")]
    UnknownContract(Address),

    /// A payout engine call reverted.
    #[error(transparent)]
    Payout(#[from] PayoutError),

    /// A distributor call reverted.
    #[error(transparent)]
    Distributor(#[from] DistributorError),

    /// Advancing the chain would overflow the block height.
    #[error("block height overflow: {height} + {blocks}")]
    HeightOverflow { height: BlockHeight, blocks: u64 },

    /// A token or voting ledger operation reverted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
