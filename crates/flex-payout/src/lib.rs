//! # flex-payout
//!
//! Epoch-indexed reward payouts.
//!
//! Rewards are deposited into the currently open epoch. Once an epoch has
//! fully elapsed, every account may claim a share of that epoch's rewards
//! proportional to its voting balance at the epoch's start height:
//!
//! ```text
//! share(account, e) = reward(e) * balance_at(account, start(e)) / total_supply_at(start(e))
//! ```
//!
//! ## Modules
//!
//! - [`schedule`] — Variable-length epoch bookkeeping
//! - [`roles`] — Admin, operator and distributor permissions
//! - [`claims`] — Claim markers and pro-rata share math
//! - [`payout`] — The payout engine contract
//! - [`report`] — Per-epoch reward breakdowns

pub mod claims;
pub mod payout;
pub mod report;
pub mod roles;
pub mod schedule;

pub use payout::{PayoutEngine, PayoutKind};
pub use report::{AccountShare, EpochReport};
pub use schedule::{EpochLengthEntry, EpochSchedule};

use flex_ledger::{CallContext, LedgerError};
use flex_types::{Address, Amount, EpochIndex};

/// Error types for payout operations.
///
/// Display strings are stable; callers match on them to tell causes apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayoutError {
    /// Caller is neither admin nor operator.
    #[error("Not authorized!")]
    NotAuthorized,

    /// Caller is not the admin.
    #[error("caller is not the admin")]
    NotAdmin,

    /// Caller is neither admin nor an allow-listed distributor.
    #[error("caller is not a valid distributor")]
    NotDistributor,

    /// Epoch 0 origin was already configured.
    #[error("start block height already set!")]
    StartHeightAlreadySet,

    /// Epoch 0 origin has not been configured.
    #[error("start block height not set")]
    StartHeightNotSet,

    /// Initial epoch length was already configured.
    #[error("init block length already set!")]
    InitLengthAlreadySet,

    /// Initial epoch length has not been configured.
    #[error("init block length not set")]
    InitLengthNotSet,

    /// Epoch lengths must be positive.
    #[error("epoch length must be greater than zero")]
    ZeroEpochLength,

    /// New epoch length equals the one it would replace.
    #[error("epoch length is the same with last epoch length")]
    SameEpochLength,

    /// A length change is already queued for a future epoch.
    #[error("next epoch length already set")]
    NextEpochLengthPending {
        /// Epoch the queued change takes effect from.
        effective_from: EpochIndex,
    },

    /// The last length entry already took effect.
    #[error("can only update next epoch length")]
    CanOnlyUpdateNextEpochLength,

    /// Queried epoch has not started yet.
    #[error("epoch {epoch} has not started, current epoch is {current}")]
    EpochNotStarted {
        /// Requested epoch.
        epoch: EpochIndex,
        /// Current epoch.
        current: EpochIndex,
    },

    /// Deposits must be positive.
    #[error("distribute amount must be greater than zero")]
    ZeroAmount,

    /// Null address where a real account is required.
    #[error("address cannot be null")]
    ZeroAddress,

    /// Arithmetic overflow in epoch or share calculation.
    #[error("arithmetic overflow")]
    Overflow,

    /// Token ledger rejected a transfer.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for payout operations.
pub type Result<T> = std::result::Result<T, PayoutError>;

/// A contract that accepts reward deposits into its current epoch.
///
/// Distributors forward their held balance into a sink; the payout engine is
/// the production implementation.
pub trait RewardSink {
    /// Address deposits are sent to.
    fn sink_address(&self) -> Address;

    /// Deposit `amount` from `ctx.caller` and return the epoch credited.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the payout engine returns [`PayoutError`].
    fn deposit(&mut self, ctx: &mut CallContext<'_>, amount: Amount) -> Result<EpochIndex>;
}
