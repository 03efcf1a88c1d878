//! Point-in-time voting power.
//!
//! Payout engines never look inside the vote-escrow ledger. They only ask two
//! questions of it: how much voting power an account had at a height, and how
//! much voting power existed in total at that height.
//!
//! [`CheckpointedBalances`] answers both from recorded checkpoints. It does
//! not model lock decay; callers record whatever balance the escrow reports.

use std::collections::{BTreeMap, HashMap};

use flex_types::{Address, Amount, BlockHeight, U256};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Read-only view of a vote-escrow ledger.
pub trait VotingPower {
    /// Voting balance of `account` as of `height`.
    fn balance_at(&self, account: Address, height: BlockHeight) -> Amount;

    /// Total voting supply as of `height`.
    fn total_supply_at(&self, height: BlockHeight) -> Amount;
}

/// Voting balances recorded as per-height checkpoints.
///
/// A checkpoint at height `h` is visible to queries at `h` and later, until
/// the next checkpoint for the same account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CheckpointedBalances {
    accounts: HashMap<Address, BTreeMap<BlockHeight, Amount>>,
    supply: BTreeMap<BlockHeight, Amount>,
}

impl CheckpointedBalances {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `balance` as the voting power of `account` from `height` on.
    ///
    /// The total supply checkpoint is adjusted by the difference to the
    /// account's previous balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NonMonotonicHeight`] if `height` precedes the latest checkpoint
    /// - [`LedgerError::Overflow`] if the total supply would overflow
    pub fn record(&mut self, account: Address, height: BlockHeight, balance: Amount) -> Result<()> {
        if let Some((&last, _)) = self.supply.last_key_value() {
            if height < last {
                return Err(LedgerError::NonMonotonicHeight { new: height, last });
            }
        }

        let previous = self.balance_at(account, height);
        let supply = self.total_supply_at(height);
        let supply = supply
            .checked_sub(previous)
            .and_then(|s| s.checked_add(balance))
            .ok_or(LedgerError::Overflow)?;

        self.accounts
            .entry(account)
            .or_default()
            .insert(height, balance);
        self.supply.insert(height, supply);

        tracing::debug!(%account, height, %balance, total = %supply, "voting checkpoint recorded");
        Ok(())
    }
}

fn value_at(checkpoints: &BTreeMap<BlockHeight, Amount>, height: BlockHeight) -> Amount {
    checkpoints
        .range(..=height)
        .next_back()
        .map(|(_, v)| *v)
        .unwrap_or(U256::ZERO)
}

impl VotingPower for CheckpointedBalances {
    fn balance_at(&self, account: Address, height: BlockHeight) -> Amount {
        self.accounts
            .get(&account)
            .map(|c| value_at(c, height))
            .unwrap_or(U256::ZERO)
    }

    fn total_supply_at(&self, height: BlockHeight) -> Amount {
        value_at(&self.supply, height)
    }
}
