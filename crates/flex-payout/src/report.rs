//! Per-epoch reward breakdowns.
//!
//! Operators use these to audit a payout: for each epoch, the start height,
//! the reward deposited, the total voting supply at the start height and
//! what every listed account is entitled to.

use flex_ledger::VotingPower;
use flex_types::{Address, Amount, BlockHeight, EpochIndex};
use serde::{Deserialize, Serialize};

use crate::claims::epoch_share;
use crate::payout::PayoutEngine;
use crate::{PayoutError, Result};

/// One account's entitlement in an epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountShare {
    pub account: Address,
    /// Voting balance at the epoch start height.
    pub balance: Amount,
    /// Share of the epoch reward.
    pub reward: Amount,
}

/// Reward breakdown of a single epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: EpochIndex,
    pub start_height: BlockHeight,
    /// Blocks in the epoch.
    pub length: u64,
    /// Rewards deposited into the epoch.
    pub reward: Amount,
    /// Total voting supply at the start height.
    pub total_supply: Amount,
    /// Whether the epoch has fully elapsed and is claimable.
    pub elapsed: bool,
    pub shares: Vec<AccountShare>,
}

impl PayoutEngine {
    /// Breakdown of `epoch` for `accounts`, as seen at `height`.
    ///
    /// Admin or operator only.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAuthorized`] for other callers
    /// - [`PayoutError::EpochNotStarted`] if `epoch` lies beyond the current epoch
    /// - [`PayoutError::Overflow`] if a share product overflows
    pub fn epoch_report(
        &self,
        caller: Address,
        epoch: EpochIndex,
        accounts: &[Address],
        voting: &dyn VotingPower,
        height: BlockHeight,
    ) -> Result<EpochReport> {
        self.roles().ensure_operator(caller)?;
        let current = self.current_epoch(height)?;
        if epoch > current {
            return Err(PayoutError::EpochNotStarted { epoch, current });
        }

        let schedule = self.schedule();
        let start_height = schedule.epoch_start_height(epoch)?;
        let reward = self.payout_for_epoch(epoch);
        let total_supply = voting.total_supply_at(start_height);

        let shares = accounts
            .iter()
            .map(|&account| {
                let balance = voting.balance_at(account, start_height);
                Ok(AccountShare {
                    account,
                    balance,
                    reward: epoch_share(reward, balance, total_supply)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EpochReport {
            epoch,
            start_height,
            length: schedule.length_of(epoch)?,
            reward,
            total_supply,
            elapsed: epoch < current,
            shares,
        })
    }

    /// Reports for every epoch from 0 through the current one.
    ///
    /// # Errors
    ///
    /// Same as [`PayoutEngine::epoch_report`].
    pub fn epoch_reports(
        &self,
        caller: Address,
        accounts: &[Address],
        voting: &dyn VotingPower,
        height: BlockHeight,
    ) -> Result<Vec<EpochReport>> {
        self.roles().ensure_operator(caller)?;
        let current = self.current_epoch(height)?;
        (0..=current)
            .map(|epoch| self.epoch_report(caller, epoch, accounts, voting, height))
            .collect()
    }
}
