//! FLEX token balances.
//!
//! A minimal fungible-token ledger: minting, transfers and balance queries.
//! Contracts hold balances under their own address exactly like accounts do.

use std::collections::HashMap;

use flex_types::{Address, Amount, U256};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Fungible token ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenLedger {
    address: Address,
    symbol: String,
    balances: HashMap<Address, Amount>,
    total_supply: Amount,
}

impl TokenLedger {
    /// Create an empty ledger for the token living at `address`.
    pub fn new(address: Address, symbol: impl Into<String>) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            balances: HashMap::new(),
            total_supply: U256::ZERO,
        }
    }

    /// Token contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Token ticker.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Balance held by `account`.
    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] if `to` is the null address
    /// - [`LedgerError::Overflow`] if the supply would exceed 2^256 - 1
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<()> {
        if to == Address::ZERO {
            return Err(LedgerError::ZeroAddress);
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = self.balances.entry(to).or_insert(U256::ZERO);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;

        tracing::debug!(%to, %amount, symbol = %self.symbol, "tokens minted");
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAddress`] if `to` is the null address
    /// - [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        if to == Address::ZERO {
            return Err(LedgerError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }

        self.balances.insert(from, available - amount);
        let balance = self.balances.entry(to).or_insert(U256::ZERO);
        // Cannot overflow: the sum of all balances is bounded by total_supply.
        *balance += amount;

        tracing::trace!(%from, %to, %amount, "token transfer");
        Ok(())
    }
}
