//! The distributor contract.

use std::collections::BTreeSet;

use flex_ledger::CallContext;
use flex_payout::RewardSink;
use flex_types::events::Event;
use flex_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::{DistributorError, Result};

/// Forwards held FLEX into a payout engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distributor {
    address: Address,
    name: String,
    admin: Address,
    payout_addr: Address,
    delegatees: BTreeSet<Address>,
}

impl Distributor {
    /// Deploy a distributor at `address` that feeds `payout_addr`.
    pub fn new(
        address: Address,
        admin: Address,
        payout_addr: Address,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        tracing::info!(%address, %admin, payout = %payout_addr, name = %name, "distributor deployed");
        Self {
            address,
            name,
            admin,
            payout_addr,
            delegatees: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Payout engine deposits are forwarded to.
    pub fn payout_addr(&self) -> Address {
        self.payout_addr
    }

    pub fn is_delegatee(&self, account: Address) -> bool {
        self.delegatees.contains(&account)
    }

    fn ensure_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(DistributorError::NotAdmin);
        }
        Ok(())
    }

    /// Allow `delegatee` to trigger [`Distributor::distribute`].
    ///
    /// # Errors
    ///
    /// - [`DistributorError::NotAdmin`] if the caller is not the admin
    /// - [`DistributorError::ZeroAddress`] for the null address
    pub fn add_distributor(&mut self, ctx: &mut CallContext<'_>, delegatee: Address) -> Result<()> {
        self.ensure_admin(ctx.caller)?;
        if delegatee == Address::ZERO {
            return Err(DistributorError::ZeroAddress);
        }
        self.delegatees.insert(delegatee);
        ctx.emit(Event::AddDistributor {
            distributor: delegatee,
        });
        tracing::info!(distributor = %self.address, %delegatee, "delegatee added");
        Ok(())
    }

    /// # Errors
    ///
    /// - [`DistributorError::NotAdmin`] if the caller is not the admin
    /// - [`DistributorError::ZeroAddress`] for the null address
    pub fn remove_distributor(
        &mut self,
        ctx: &mut CallContext<'_>,
        delegatee: Address,
    ) -> Result<()> {
        self.ensure_admin(ctx.caller)?;
        if delegatee == Address::ZERO {
            return Err(DistributorError::ZeroAddress);
        }
        self.delegatees.remove(&delegatee);
        ctx.emit(Event::RemoveDistributor {
            distributor: delegatee,
        });
        tracing::info!(distributor = %self.address, %delegatee, "delegatee removed");
        Ok(())
    }

    /// Forward the whole held balance into `sink`, which must be the
    /// configured payout engine. The distributor is the caller of the
    /// deposit. Returns the amount forwarded.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::NotDelegatee`] unless the caller is admin or delegatee
    /// - [`DistributorError::PayoutMismatch`] if `sink` is not the configured payout engine
    /// - [`DistributorError::ZeroBalance`] if nothing is held
    /// - [`DistributorError::Payout`] if the payout engine rejects the deposit
    pub fn distribute(
        &self,
        ctx: &mut CallContext<'_>,
        sink: &mut impl RewardSink,
    ) -> Result<Amount> {
        let caller = ctx.caller;
        if caller != self.admin && !self.is_delegatee(caller) {
            tracing::warn!(distributor = %self.address, %caller, "distribute rejected");
            return Err(DistributorError::NotDelegatee);
        }
        let sink_addr = sink.sink_address();
        if sink_addr != self.payout_addr {
            return Err(DistributorError::PayoutMismatch {
                expected: self.payout_addr,
                actual: sink_addr,
            });
        }
        let balance = ctx.token.balance_of(self.address);
        if balance.is_zero() {
            return Err(DistributorError::ZeroBalance);
        }

        let epoch = sink.deposit(&mut ctx.nested(sink_addr), balance)?;
        tracing::debug!(distributor = %self.address, %caller, epoch, amount = %balance, "rewards forwarded");
        Ok(balance)
    }

    /// Point the distributor at a different payout engine.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::NotAdmin`] if the caller is not the admin
    /// - [`DistributorError::ZeroAddress`] for the null address
    pub fn update_payout_addr(
        &mut self,
        ctx: &mut CallContext<'_>,
        payout_addr: Address,
    ) -> Result<()> {
        self.ensure_admin(ctx.caller)?;
        if payout_addr == Address::ZERO {
            return Err(DistributorError::ZeroAddress);
        }
        let prev_payout_addr = std::mem::replace(&mut self.payout_addr, payout_addr);
        ctx.emit(Event::UpdatePayoutAddr {
            prev_payout_addr,
            curr_payout_addr: payout_addr,
        });
        tracing::info!(distributor = %self.address, prev = %prev_payout_addr, curr = %payout_addr, "payout address updated");
        Ok(())
    }

    /// Return held tokens to `to`. `None` returns the whole balance.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::NotAdmin`] if the caller is not the admin
    /// - [`DistributorError::NullRecipient`] if `to` is the null address
    /// - [`DistributorError::NoBalance`] if nothing is held
    /// - [`DistributorError::ZeroAmount`] if an explicit zero amount is given
    /// - [`DistributorError::ExceedsBalance`] if `amount` is more than is held
    pub fn revert_transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: Address,
        amount: Option<Amount>,
    ) -> Result<Amount> {
        self.ensure_admin(ctx.caller)?;
        if to == Address::ZERO {
            return Err(DistributorError::NullRecipient);
        }
        let balance = ctx.token.balance_of(self.address);
        if balance.is_zero() {
            return Err(DistributorError::NoBalance);
        }
        let amount = amount.unwrap_or(balance);
        if amount.is_zero() {
            return Err(DistributorError::ZeroAmount);
        }
        if amount > balance {
            return Err(DistributorError::ExceedsBalance);
        }

        ctx.transfer_token(self.address, to, amount)?;
        ctx.emit(Event::RevertTransfer { to, amount });
        tracing::info!(distributor = %self.address, %to, %amount, "held rewards returned");
        Ok(amount)
    }

    /// Hand the admin role to `new_owner`.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::NotAdmin`] if the caller is not the admin
    /// - [`DistributorError::ZeroAddress`] for the null address
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut CallContext<'_>,
        new_owner: Address,
    ) -> Result<()> {
        self.ensure_admin(ctx.caller)?;
        if new_owner == Address::ZERO {
            return Err(DistributorError::ZeroAddress);
        }
        let previous_owner = std::mem::replace(&mut self.admin, new_owner);
        ctx.emit(Event::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        tracing::info!(distributor = %self.address, %previous_owner, %new_owner, "ownership transferred");
        Ok(())
    }
}
