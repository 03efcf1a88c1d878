//! Claim markers and pro-rata share math.
//!
//! Each account carries the index of the first epoch it has not been paid
//! for. A claim pays every elapsed epoch from that marker up to (excluding)
//! the current epoch and then moves the marker forward. Epochs before the
//! marker are never summed again.

use std::collections::HashMap;

use flex_types::{Address, Amount, EpochIndex, U256};
use serde::{Deserialize, Serialize};

use crate::{PayoutError, Result};

/// Per-account claim markers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClaimLedger {
    next_unclaimed: HashMap<Address, EpochIndex>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// First epoch `account` has not been paid for. Zero before any claim.
    pub fn next_unclaimed(&self, account: Address) -> EpochIndex {
        self.next_unclaimed.get(&account).copied().unwrap_or(0)
    }

    /// Record that `account` has been paid for every epoch before `epoch`.
    ///
    /// Markers never move backwards.
    pub fn mark_claimed(&mut self, account: Address, epoch: EpochIndex) {
        let marker = self.next_unclaimed.entry(account).or_insert(0);
        if epoch > *marker {
            *marker = epoch;
        }
    }
}

/// `reward * balance / supply`, floored. A zero supply yields zero.
///
/// # Errors
///
/// - [`PayoutError::Overflow`] if `reward * balance` exceeds 2^256 - 1
pub fn epoch_share(reward: Amount, balance: Amount, supply: Amount) -> Result<Amount> {
    if supply.is_zero() || reward.is_zero() || balance.is_zero() {
        return Ok(U256::ZERO);
    }
    let product = reward.checked_mul(balance).ok_or(PayoutError::Overflow)?;
    Ok(product / supply)
}
