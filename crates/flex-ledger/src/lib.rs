//! # flex-ledger
//!
//! Ledgers the payout contracts read from and write to.
//!
//! ## Modules
//!
//! - [`token`] — FLEX token balances and transfers
//! - [`voting`] — Point-in-time voting power queries
//! - [`context`] — Per-call execution context

pub mod context;
pub mod token;
pub mod voting;

pub use context::CallContext;
pub use token::TokenLedger;
pub use voting::{CheckpointedBalances, VotingPower};

use flex_types::{Address, Amount, BlockHeight};

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Sender does not hold enough tokens.
    #[error("insufficient balance: {account} has {available}, needs {needed}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Amount requested.
        needed: Amount,
        /// Amount held.
        available: Amount,
    },

    /// Tokens cannot be sent to or minted for the null address.
    #[error("cannot transfer to the zero address")]
    ZeroAddress,

    /// Arithmetic overflow in a balance update.
    #[error("arithmetic overflow")]
    Overflow,

    /// Checkpoint height is older than the latest recorded checkpoint.
    #[error("non-monotonic checkpoint height: {new} < {last}")]
    NonMonotonicHeight {
        /// The rejected height.
        new: BlockHeight,
        /// The latest recorded height.
        last: BlockHeight,
    },
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
