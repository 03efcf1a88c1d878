//! Contract events.
//!
//! Every successful state change on a payout engine, distributor or token
//! ledger emits exactly one event. Events are collected per transaction and
//! committed to the chain log only when the transaction succeeds.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, BlockHeight};

/// All contract event types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "PascalCase",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    /// Operator membership changed on a payout engine.
    IsOperator { account: Address, status: bool },
    /// An address was added to a distributor allow-list.
    AddDistributor { distributor: Address },
    /// An address was removed from a distributor allow-list.
    RemoveDistributor { distributor: Address },
    /// Rewards were deposited into the current epoch.
    CallDistribute { distributor: Address, amount: Amount },
    /// A distributor was pointed at a different payout engine.
    UpdatePayoutAddr {
        prev_payout_addr: Address,
        curr_payout_addr: Address,
    },
    /// Rewards were paid to an account.
    Claim { account: Address, amount: Amount },
    /// Admin rights were handed over.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    /// Held distributor funds were returned.
    RevertTransfer { to: Address, amount: Amount },
    /// Token balance moved between two addresses.
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
}

impl Event {
    /// Event name as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsOperator { .. } => "IsOperator",
            Self::AddDistributor { .. } => "AddDistributor",
            Self::RemoveDistributor { .. } => "RemoveDistributor",
            Self::CallDistribute { .. } => "CallDistribute",
            Self::UpdatePayoutAddr { .. } => "UpdatePayoutAddr",
            Self::Claim { .. } => "Claim",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::RevertTransfer { .. } => "RevertTransfer",
            Self::Transfer { .. } => "Transfer",
        }
    }
}

/// An event together with the contract that emitted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Block the emitting transaction landed in.
    pub block: BlockHeight,
    /// Emitting contract.
    pub emitter: Address,
    pub event: Event,
}
