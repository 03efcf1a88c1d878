//! The payout engine contract.
//!
//! A [`PayoutEngine`] owns the epoch schedule, the per-epoch reward buckets
//! and the claim markers. Mutating operations take a [`CallContext`] so the
//! engine can check the caller, move tokens and emit events; views take the
//! height they are evaluated at.
//!
//! Lifecycle:
//!
//! 1. Admin sets the start height and the initial epoch length.
//! 2. Admin allow-lists distributors (and optionally operators).
//! 3. Distributors deposit rewards into the current epoch.
//! 4. Once an epoch has elapsed, accounts claim their share of it.

use std::collections::BTreeMap;

use flex_ledger::{CallContext, VotingPower};
use flex_types::events::Event;
use flex_types::{
    Address, Amount, BlockHeight, EpochIndex, DAILY_EPOCH_BLOCKS, QUARTERLY_EPOCH_BLOCKS, U256,
};
use serde::{Deserialize, Serialize};

use crate::claims::{epoch_share, ClaimLedger};
use crate::roles::Roles;
use crate::schedule::{EpochLengthEntry, EpochSchedule};
use crate::{PayoutError, Result, RewardSink};

/// Payout cadence preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// One epoch per day.
    Daily,
    /// One epoch per 13 weeks.
    Quarterly,
    /// Arbitrary epoch length in blocks.
    Custom(u64),
}

impl PayoutKind {
    /// Suggested initial epoch length in blocks.
    pub fn epoch_blocks(&self) -> u64 {
        match self {
            Self::Daily => DAILY_EPOCH_BLOCKS,
            Self::Quarterly => QUARTERLY_EPOCH_BLOCKS,
            Self::Custom(blocks) => *blocks,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Quarterly => "quarterly",
            Self::Custom(_) => "custom",
        }
    }
}

/// Epoch-indexed reward payout contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutEngine {
    address: Address,
    kind: PayoutKind,
    roles: Roles,
    schedule: EpochSchedule,
    rewards: BTreeMap<EpochIndex, Amount>,
    claims: ClaimLedger,
}

impl PayoutEngine {
    /// Deploy an unconfigured engine at `address` administered by `admin`.
    pub fn new(address: Address, admin: Address, kind: PayoutKind) -> Self {
        tracing::info!(%address, %admin, kind = kind.name(), "payout engine deployed");
        Self {
            address,
            kind,
            roles: Roles::new(admin),
            schedule: EpochSchedule::new(),
            rewards: BTreeMap::new(),
            claims: ClaimLedger::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> PayoutKind {
        self.kind
    }

    pub fn admin(&self) -> Address {
        self.roles.admin()
    }

    /// Epoch 0 origin, once configured.
    pub fn start_block_height(&self) -> Option<BlockHeight> {
        self.schedule.start_height()
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    // ---------------------------------------------------------------------
    // Epoch configuration
    // ---------------------------------------------------------------------

    /// Set the epoch 0 origin. Admin only, one-time.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::StartHeightAlreadySet`] on a second call
    pub fn set_start_block_height(
        &mut self,
        ctx: &mut CallContext<'_>,
        height: BlockHeight,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        self.schedule.set_start_height(height)?;
        tracing::info!(payout = %self.address, height, "epoch start height set");
        Ok(())
    }

    /// Set the initial epoch length. Admin only, one-time.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::InitLengthAlreadySet`] on a second call
    /// - [`PayoutError::ZeroEpochLength`] if `length` is zero
    pub fn set_init_epoch_block_length(
        &mut self,
        ctx: &mut CallContext<'_>,
        length: u64,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        self.schedule.set_init_length(length)?;
        tracing::info!(payout = %self.address, length, "initial epoch length set");
        Ok(())
    }

    /// Queue a length change effective from the next epoch. Admin only.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::SameEpochLength`] if `length` equals the last recorded length
    /// - [`PayoutError::NextEpochLengthPending`] if a change is already queued
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    pub fn set_next_epoch_length(
        &mut self,
        ctx: &mut CallContext<'_>,
        length: u64,
    ) -> Result<EpochLengthEntry> {
        self.roles.ensure_admin(ctx.caller)?;
        let entry = self.schedule.schedule_next_length(length, ctx.height)?;
        tracing::info!(
            payout = %self.address,
            effective_from = entry.effective_from,
            length,
            "next epoch length scheduled"
        );
        Ok(entry)
    }

    /// Correct the queued length change before it takes effect. Admin only.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::CanOnlyUpdateNextEpochLength`] once the entry took effect
    /// - [`PayoutError::SameEpochLength`] if `length` equals the preceding length
    pub fn update_last_epoch_length(
        &mut self,
        ctx: &mut CallContext<'_>,
        length: u64,
    ) -> Result<EpochLengthEntry> {
        self.roles.ensure_admin(ctx.caller)?;
        let entry = self.schedule.update_last_length(length, ctx.height)?;
        tracing::info!(
            payout = %self.address,
            effective_from = entry.effective_from,
            length,
            "queued epoch length updated"
        );
        Ok(entry)
    }

    /// The `index`-th epoch length history entry.
    pub fn epoch_length_history(&self, index: usize) -> Option<EpochLengthEntry> {
        self.schedule.entry(index)
    }

    // ---------------------------------------------------------------------
    // Epoch views
    // ---------------------------------------------------------------------

    /// Epoch containing `height`. Ungated.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    pub fn current_epoch(&self, height: BlockHeight) -> Result<EpochIndex> {
        self.schedule.epoch_at(height)
    }

    /// Epoch containing `height`. Admin or operator only.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAuthorized`] for other callers
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    pub fn get_current_epoch(&self, caller: Address, height: BlockHeight) -> Result<EpochIndex> {
        self.roles.ensure_operator(caller)?;
        self.schedule.epoch_at(height)
    }

    /// First height of `epoch`. Admin or operator only.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAuthorized`] for other callers
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    pub fn get_epoch_start_block_height(
        &self,
        caller: Address,
        epoch: EpochIndex,
    ) -> Result<BlockHeight> {
        self.roles.ensure_operator(caller)?;
        self.schedule.epoch_start_height(epoch)
    }

    /// Rewards deposited into `epoch`.
    pub fn payout_for_epoch(&self, epoch: EpochIndex) -> Amount {
        self.rewards.get(&epoch).copied().unwrap_or(U256::ZERO)
    }

    /// Sum of all deposits ever made.
    pub fn total_deposited(&self) -> Amount {
        self.rewards
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    // ---------------------------------------------------------------------
    // Deposits
    // ---------------------------------------------------------------------

    /// Pull `amount` from the caller into the current epoch's bucket.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotDistributor`] unless the caller is admin or an allow-listed distributor
    /// - [`PayoutError::ZeroAmount`] if `amount` is zero
    /// - [`PayoutError::Ledger`] if the caller's balance is insufficient
    pub fn distribute(&mut self, ctx: &mut CallContext<'_>, amount: Amount) -> Result<EpochIndex> {
        let caller = ctx.caller;
        if let Err(e) = self.roles.ensure_distributor(caller) {
            tracing::warn!(payout = %self.address, %caller, "distribute rejected");
            return Err(e);
        }
        if amount.is_zero() {
            return Err(PayoutError::ZeroAmount);
        }

        let epoch = self.schedule.epoch_at(ctx.height)?;
        let bucket = self
            .payout_for_epoch(epoch)
            .checked_add(amount)
            .ok_or(PayoutError::Overflow)?;

        ctx.transfer_token(caller, self.address, amount)?;
        self.rewards.insert(epoch, bucket);
        ctx.emit(Event::CallDistribute {
            distributor: caller,
            amount,
        });

        tracing::debug!(payout = %self.address, %caller, epoch, %amount, total = %bucket, "rewards deposited");
        Ok(epoch)
    }

    // ---------------------------------------------------------------------
    // Claims
    // ---------------------------------------------------------------------

    /// First epoch `account` has not been paid for.
    pub fn next_unclaimed_epoch(&self, account: Address) -> EpochIndex {
        self.claims.next_unclaimed(account)
    }

    /// Amount `account` would receive from a claim at `height`.
    ///
    /// Sums the account's share of every fully elapsed epoch not yet paid.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    /// - [`PayoutError::Overflow`] if a share product overflows
    pub fn get_claimable(
        &self,
        account: Address,
        voting: &dyn VotingPower,
        height: BlockHeight,
    ) -> Result<Amount> {
        let current = self.schedule.epoch_at(height)?;
        let from = self.claims.next_unclaimed(account);
        if from >= current {
            return Ok(U256::ZERO);
        }

        let mut total = U256::ZERO;
        for (&epoch, &reward) in self.rewards.range(from..current) {
            let start = self.schedule.epoch_start_height(epoch)?;
            let share = epoch_share(
                reward,
                voting.balance_at(account, start),
                voting.total_supply_at(start),
            )?;
            total = total.checked_add(share).ok_or(PayoutError::Overflow)?;
        }
        Ok(total)
    }

    /// Pay `account` its claimable amount and advance its claim marker.
    ///
    /// Anyone may trigger a claim; funds always go to `account`. Returns the
    /// amount paid, which is zero when nothing new has elapsed.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroAddress`] if `account` is the null address
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    /// - [`PayoutError::Overflow`] if a share product overflows
    pub fn claim(&mut self, ctx: &mut CallContext<'_>, account: Address) -> Result<Amount> {
        if account == Address::ZERO {
            return Err(PayoutError::ZeroAddress);
        }
        let current = self.schedule.epoch_at(ctx.height)?;
        let amount = self.get_claimable(account, ctx.voting, ctx.height)?;

        if !amount.is_zero() {
            ctx.transfer_token(self.address, account, amount)?;
            ctx.emit(Event::Claim { account, amount });
        }
        self.claims.mark_claimed(account, current);

        tracing::debug!(payout = %self.address, %account, %amount, through = current, "rewards claimed");
        Ok(amount)
    }

    // ---------------------------------------------------------------------
    // Roles
    // ---------------------------------------------------------------------

    pub fn is_operator(&self, account: Address) -> bool {
        self.roles.is_operator(account)
    }

    pub fn is_distributor(&self, account: Address) -> bool {
        self.roles.is_distributor(account)
    }

    /// Allow-listed distributors in address order.
    pub fn distributors(&self) -> impl Iterator<Item = &Address> + '_ {
        self.roles.distributors()
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn add_operator(&mut self, ctx: &mut CallContext<'_>, account: Address) -> Result<()> {
        self.set_operator(ctx, account, true)
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn remove_operator(&mut self, ctx: &mut CallContext<'_>, account: Address) -> Result<()> {
        self.set_operator(ctx, account, false)
    }

    fn set_operator(
        &mut self,
        ctx: &mut CallContext<'_>,
        account: Address,
        status: bool,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        self.roles.set_operator(account, status)?;
        ctx.emit(Event::IsOperator { account, status });
        tracing::info!(payout = %self.address, %account, status, "operator updated");
        Ok(())
    }

    /// Allow `distributor` to deposit rewards.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn add_distributor(
        &mut self,
        ctx: &mut CallContext<'_>,
        distributor: Address,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        self.roles.set_distributor(distributor, true)?;
        ctx.emit(Event::AddDistributor { distributor });
        tracing::info!(payout = %self.address, %distributor, "distributor added");
        Ok(())
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn remove_distributor(
        &mut self,
        ctx: &mut CallContext<'_>,
        distributor: Address,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        self.roles.set_distributor(distributor, false)?;
        ctx.emit(Event::RemoveDistributor { distributor });
        tracing::info!(payout = %self.address, %distributor, "distributor removed");
        Ok(())
    }

    /// Hand the admin role to `new_owner`.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] if the caller is not the admin
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut CallContext<'_>,
        new_owner: Address,
    ) -> Result<()> {
        self.roles.ensure_admin(ctx.caller)?;
        let previous_owner = self.roles.transfer_admin(new_owner)?;
        ctx.emit(Event::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        tracing::info!(payout = %self.address, %previous_owner, %new_owner, "ownership transferred");
        Ok(())
    }

    pub(crate) fn roles(&self) -> &Roles {
        &self.roles
    }
}

impl RewardSink for PayoutEngine {
    fn sink_address(&self) -> Address {
        self.address
    }

    fn deposit(&mut self, ctx: &mut CallContext<'_>, amount: Amount) -> Result<EpochIndex> {
        self.distribute(ctx, amount)
    }
}
