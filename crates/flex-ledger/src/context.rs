//! Per-call execution context.
//!
//! A [`CallContext`] is what a contract method sees of the world: who called
//! it, its own address, the current block height, the token ledger, the
//! voting-power ledger, and the event buffer of the enclosing transaction.

use flex_types::events::{Event, LogEntry};
use flex_types::{Address, Amount, BlockHeight};

use crate::token::TokenLedger;
use crate::voting::VotingPower;
use crate::Result;

/// Execution context for a single contract call.
pub struct CallContext<'a> {
    /// Immediate caller (an account or another contract).
    pub caller: Address,
    /// Address of the contract being executed.
    pub this: Address,
    /// Height of the block the call executes in.
    pub height: BlockHeight,
    /// Reward token ledger.
    pub token: &'a mut TokenLedger,
    /// Vote-escrow ledger.
    pub voting: &'a dyn VotingPower,
    events: &'a mut Vec<LogEntry>,
}

impl<'a> CallContext<'a> {
    /// Build a context for a top-level call.
    pub fn new(
        caller: Address,
        this: Address,
        height: BlockHeight,
        token: &'a mut TokenLedger,
        voting: &'a dyn VotingPower,
        events: &'a mut Vec<LogEntry>,
    ) -> Self {
        Self {
            caller,
            this,
            height,
            token,
            voting,
            events,
        }
    }

    /// Context for a call from the current contract into `callee`.
    ///
    /// The current contract becomes the caller; ledgers and the event buffer
    /// are shared with the outer call.
    pub fn nested(&mut self, callee: Address) -> CallContext<'_> {
        CallContext {
            caller: self.this,
            this: callee,
            height: self.height,
            token: &mut *self.token,
            voting: self.voting,
            events: &mut *self.events,
        }
    }

    /// Emit an event from the executing contract.
    pub fn emit(&mut self, event: Event) {
        tracing::trace!(emitter = %self.this, event = event.name(), "event emitted");
        self.events.push(LogEntry {
            block: self.height,
            emitter: self.this,
            event,
        });
    }

    /// Transfer tokens and emit the token ledger's `Transfer` event.
    ///
    /// # Errors
    ///
    /// Propagates the token ledger's rejection.
    pub fn transfer_token(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.token.transfer(from, to, amount)?;
        self.events.push(LogEntry {
            block: self.height,
            emitter: self.token.address(),
            event: Event::Transfer { from, to, amount },
        });
        Ok(())
    }
}
