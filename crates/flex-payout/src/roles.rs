//! Admin, operator and distributor permissions.
//!
//! The admin is implicitly a member of every role. Operators may read the
//! gated epoch views; distributors may deposit rewards.

use std::collections::BTreeSet;

use flex_types::Address;
use serde::{Deserialize, Serialize};

use crate::{PayoutError, Result};

/// Role sets of a payout engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Roles {
    admin: Address,
    operators: BTreeSet<Address>,
    distributors: BTreeSet<Address>,
}

impl Roles {
    /// Roles with `admin` as the only privileged account.
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            operators: BTreeSet::new(),
            distributors: BTreeSet::new(),
        }
    }

    /// Current admin.
    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_operator(&self, account: Address) -> bool {
        self.operators.contains(&account)
    }

    pub fn is_distributor(&self, account: Address) -> bool {
        self.distributors.contains(&account)
    }

    /// Allow-listed distributors in address order.
    pub fn distributors(&self) -> impl Iterator<Item = &Address> {
        self.distributors.iter()
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotAdmin`] unless `caller` is the admin
    pub fn ensure_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(PayoutError::NotAdmin);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotAuthorized`] unless `caller` is admin or operator
    pub fn ensure_operator(&self, caller: Address) -> Result<()> {
        if caller != self.admin && !self.is_operator(caller) {
            return Err(PayoutError::NotAuthorized);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - [`PayoutError::NotDistributor`] unless `caller` is admin or distributor
    pub fn ensure_distributor(&self, caller: Address) -> Result<()> {
        if caller != self.admin && !self.is_distributor(caller) {
            return Err(PayoutError::NotDistributor);
        }
        Ok(())
    }

    /// Grant or revoke operator status.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn set_operator(&mut self, account: Address, status: bool) -> Result<()> {
        if account == Address::ZERO {
            return Err(PayoutError::ZeroAddress);
        }
        if status {
            self.operators.insert(account);
        } else {
            self.operators.remove(&account);
        }
        Ok(())
    }

    /// Grant or revoke distributor status.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn set_distributor(&mut self, account: Address, status: bool) -> Result<()> {
        if account == Address::ZERO {
            return Err(PayoutError::ZeroAddress);
        }
        if status {
            self.distributors.insert(account);
        } else {
            self.distributors.remove(&account);
        }
        Ok(())
    }

    /// Hand the admin role to `new_admin`, returning the previous admin.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroAddress`] for the null address
    pub fn transfer_admin(&mut self, new_admin: Address) -> Result<Address> {
        if new_admin == Address::ZERO {
            return Err(PayoutError::ZeroAddress);
        }
        Ok(std::mem::replace(&mut self.admin, new_admin))
    }
}
