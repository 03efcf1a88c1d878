//! Contract registry, transactions and views.

use std::collections::{BTreeMap, HashMap};

use flex_distributor::Distributor;
use flex_ledger::{CallContext, CheckpointedBalances, TokenLedger, VotingPower};
use flex_payout::{EpochReport, PayoutEngine, PayoutKind};
use flex_types::events::{Event, LogEntry};
use flex_types::{contract_address, Address, Amount, BlockHeight, EpochIndex};
use serde::Serialize;

use crate::{ChainError, Result};

/// Outcome of a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt<T> {
    /// Block the transaction landed in.
    pub block: BlockHeight,
    /// Events emitted, in order.
    pub events: Vec<LogEntry>,
    /// Return value of the call.
    pub value: T,
}

impl<T> Receipt<T> {
    /// Events of the given name.
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .map(|log| &log.event)
            .filter(move |event| event.name() == name)
    }
}

/// Everything a transaction may mutate.
#[derive(Clone, Debug)]
struct State {
    token: TokenLedger,
    voting: CheckpointedBalances,
    payouts: BTreeMap<Address, PayoutEngine>,
    distributors: BTreeMap<Address, Distributor>,
    nonces: HashMap<Address, u64>,
}

impl State {
    fn next_address(&mut self, deployer: Address) -> Address {
        let nonce = self.nonces.entry(deployer).or_insert(0);
        let address = contract_address(deployer, *nonce);
        *nonce += 1;
        address
    }
}

/// The serial executor.
#[derive(Debug)]
pub struct Chain {
    height: BlockHeight,
    state: State,
    log: Vec<LogEntry>,
}

impl Chain {
    /// Start a chain at height 0 with the FLEX token deployed by `deployer`.
    ///
    /// `supply` is minted to the deployer.
    ///
    /// # Errors
    ///
    /// - [`ChainError::Ledger`] if `deployer` is the null address
    pub fn new(deployer: Address, supply: Amount) -> Result<Self> {
        let mut nonces = HashMap::new();
        nonces.insert(deployer, 1);
        let mut token = TokenLedger::new(contract_address(deployer, 0), "FLEX");
        token.mint(deployer, supply)?;

        tracing::info!(token = %token.address(), %deployer, %supply, "chain started");
        Ok(Self {
            height: 0,
            state: State {
                token,
                voting: CheckpointedBalances::new(),
                payouts: BTreeMap::new(),
                distributors: BTreeMap::new(),
                nonces,
            },
            log: Vec::new(),
        })
    }

    /// Latest mined height.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn token(&self) -> &TokenLedger {
        &self.state.token
    }

    pub fn voting(&self) -> &CheckpointedBalances {
        &self.state.voting
    }

    /// Events of every committed transaction.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if no payout engine lives at `address`
    pub fn payout(&self, address: Address) -> Result<&PayoutEngine> {
        self.state
            .payouts
            .get(&address)
            .ok_or(ChainError::UnknownContract(address))
    }

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if no distributor lives at `address`
    pub fn distributor(&self, address: Address) -> Result<&Distributor> {
        self.state
            .distributors
            .get(&address)
            .ok_or(ChainError::UnknownContract(address))
    }

    /// Mine `blocks` empty blocks and return the new height.
    ///
    /// # Errors
    ///
    /// - [`ChainError::HeightOverflow`] if the height would not fit in 64 bits
    pub fn mine(&mut self, blocks: u64) -> Result<BlockHeight> {
        self.height = self.advance(blocks)?;
        tracing::trace!(height = self.height, blocks, "blocks mined");
        Ok(self.height)
    }

    fn advance(&self, blocks: u64) -> Result<BlockHeight> {
        self.height
            .checked_add(blocks)
            .ok_or(ChainError::HeightOverflow {
                height: self.height,
                blocks,
            })
    }

    /// Mine one block and run `f` in it, rolling state back if it fails.
    ///
    /// The whole state is cloned as the rollback point, so each transaction
    /// costs time proportional to the number of checkpoints and buckets.
    fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut State, BlockHeight, &mut Vec<LogEntry>) -> Result<T>,
    ) -> Result<Receipt<T>> {
        let block = self.advance(1)?;
        self.height = block;
        let snapshot = self.state.clone();
        let mut events = Vec::new();

        match f(&mut self.state, block, &mut events) {
            Ok(value) => {
                self.log.extend(events.iter().cloned());
                Ok(Receipt {
                    block,
                    events,
                    value,
                })
            }
            Err(e) => {
                self.state = snapshot;
                tracing::warn!(block, error = %e, "transaction reverted");
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Token and voting ledger
    // ---------------------------------------------------------------------

    /// Transfer FLEX from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`ChainError::Ledger`] on insufficient balance or a null recipient
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<Receipt<()>> {
        self.transact(|state, block, events| {
            let token = state.token.address();
            let mut ctx = CallContext::new(from, token, block, &mut state.token, &state.voting, events);
            ctx.transfer_token(from, to, amount)?;
            Ok(())
        })
    }

    /// Record `balance` as the voting power of `account` from this transaction's block on.
    ///
    /// # Errors
    ///
    /// - [`ChainError::Ledger`] if the checkpoint cannot be recorded
    pub fn stake(&mut self, account: Address, balance: Amount) -> Result<Receipt<()>> {
        self.transact(|state, block, _| {
            state.voting.record(account, block, balance)?;
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Deployment
    // ---------------------------------------------------------------------

    /// Deploy a payout engine administered by `deployer`.
    ///
    /// # Errors
    ///
    /// Infallible in practice; returns the receipt of the deployment block.
    pub fn deploy_payout(&mut self, deployer: Address, kind: PayoutKind) -> Result<Receipt<Address>> {
        self.transact(|state, _, _| {
            let address = state.next_address(deployer);
            state
                .payouts
                .insert(address, PayoutEngine::new(address, deployer, kind));
            Ok(address)
        })
    }

    /// Deploy a distributor feeding `payout`, administered by `deployer`.
    ///
    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if no payout engine lives at `payout`
    pub fn deploy_distributor(
        &mut self,
        deployer: Address,
        payout: Address,
        name: &str,
    ) -> Result<Receipt<Address>> {
        self.transact(|state, _, _| {
            if !state.payouts.contains_key(&payout) {
                return Err(ChainError::UnknownContract(payout));
            }
            let address = state.next_address(deployer);
            state
                .distributors
                .insert(address, Distributor::new(address, deployer, payout, name));
            Ok(address)
        })
    }

    // ---------------------------------------------------------------------
    // Contract calls
    // ---------------------------------------------------------------------

    /// Call a payout engine method as `caller`.
    ///
    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if no payout engine lives at `payout`
    /// - [`ChainError::Payout`] if the call reverts
    pub fn call_payout<T>(
        &mut self,
        caller: Address,
        payout: Address,
        f: impl FnOnce(&mut PayoutEngine, &mut CallContext<'_>) -> flex_payout::Result<T>,
    ) -> Result<Receipt<T>> {
        self.transact(|state, block, events| {
            let State {
                token,
                voting,
                payouts,
                ..
            } = state;
            let engine = payouts
                .get_mut(&payout)
                .ok_or(ChainError::UnknownContract(payout))?;
            let mut ctx = CallContext::new(caller, payout, block, token, &*voting, events);
            Ok(f(engine, &mut ctx)?)
        })
    }

    /// Call a distributor method as `caller`.
    ///
    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if no distributor lives at `distributor`
    /// - [`ChainError::Distributor`] if the call reverts
    pub fn call_distributor<T>(
        &mut self,
        caller: Address,
        distributor: Address,
        f: impl FnOnce(&mut Distributor, &mut CallContext<'_>) -> flex_distributor::Result<T>,
    ) -> Result<Receipt<T>> {
        self.transact(|state, block, events| {
            let State {
                token,
                voting,
                distributors,
                ..
            } = state;
            let contract = distributors
                .get_mut(&distributor)
                .ok_or(ChainError::UnknownContract(distributor))?;
            let mut ctx = CallContext::new(caller, distributor, block, token, &*voting, events);
            Ok(f(contract, &mut ctx)?)
        })
    }

    /// Trigger `Distributor::distribute` as `caller`, forwarding into the
    /// distributor's configured payout engine.
    ///
    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] if either contract is missing
    /// - [`ChainError::Distributor`] if the distributor or the payout engine reverts
    pub fn distribute_via(&mut self, caller: Address, distributor: Address) -> Result<Receipt<Amount>> {
        self.transact(|state, block, events| {
            let State {
                token,
                voting,
                payouts,
                distributors,
                ..
            } = state;
            let contract = distributors
                .get(&distributor)
                .ok_or(ChainError::UnknownContract(distributor))?;
            let payout_addr = contract.payout_addr();
            let engine = payouts
                .get_mut(&payout_addr)
                .ok_or(ChainError::UnknownContract(payout_addr))?;
            let mut ctx = CallContext::new(caller, distributor, block, token, &*voting, events);
            Ok(contract.distribute(&mut ctx, engine)?)
        })
    }

    // ---------------------------------------------------------------------
    // Views at the latest height
    // ---------------------------------------------------------------------

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] / [`ChainError::Payout`]
    pub fn current_epoch(&self, payout: Address) -> Result<EpochIndex> {
        Ok(self.payout(payout)?.current_epoch(self.height)?)
    }

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] / [`ChainError::Payout`] (including `Not authorized!`)
    pub fn get_current_epoch(&self, caller: Address, payout: Address) -> Result<EpochIndex> {
        Ok(self.payout(payout)?.get_current_epoch(caller, self.height)?)
    }

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] / [`ChainError::Payout`] (including `Not authorized!`)
    pub fn get_epoch_start_block_height(
        &self,
        caller: Address,
        payout: Address,
        epoch: EpochIndex,
    ) -> Result<BlockHeight> {
        Ok(self.payout(payout)?.get_epoch_start_block_height(caller, epoch)?)
    }

    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] / [`ChainError::Payout`]
    pub fn claimable(&self, payout: Address, account: Address) -> Result<Amount> {
        let voting: &dyn VotingPower = &self.state.voting;
        Ok(self.payout(payout)?.get_claimable(account, voting, self.height)?)
    }

    /// Reports for every epoch through the current one.
    ///
    /// # Errors
    ///
    /// - [`ChainError::UnknownContract`] / [`ChainError::Payout`] (including `Not authorized!`)
    pub fn epoch_reports(
        &self,
        caller: Address,
        payout: Address,
        accounts: &[Address],
    ) -> Result<Vec<EpochReport>> {
        Ok(self
            .payout(payout)?
            .epoch_reports(caller, accounts, &self.state.voting, self.height)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_distributor::DistributorError;
    use flex_payout::PayoutError;
    use flex_types::{flex, named_account, U256};

    fn chain_with_payout() -> (Chain, Address, Address) {
        let admin = named_account("admin");
        let mut chain = Chain::new(admin, flex(1_000)).expect("chain");
        let payout = chain
            .deploy_payout(admin, PayoutKind::Custom(10))
            .expect("deploy")
            .value;
        (chain, admin, payout)
    }

    #[test]
    fn test_each_transaction_mines_a_block() {
        let (mut chain, admin, _) = chain_with_payout();
        assert_eq!(chain.height(), 1);
        let receipt = chain
            .transfer(admin, named_account("alice"), flex(1))
            .expect("transfer");
        assert_eq!(receipt.block, 2);
        chain.mine(5).expect("mine");
        assert_eq!(chain.height(), 7);
    }

    #[test]
    fn test_height_overflow_is_an_error() {
        let (mut chain, admin, _) = chain_with_payout();
        let height = chain.height();
        assert_eq!(
            chain.mine(u64::MAX),
            Err(ChainError::HeightOverflow {
                height,
                blocks: u64::MAX
            })
        );
        assert_eq!(chain.height(), height);

        chain.mine(u64::MAX - height).expect("mine to the last height");
        let err = chain
            .transfer(admin, named_account("alice"), flex(1))
            .expect_err("no block left");
        assert_eq!(
            err,
            ChainError::HeightOverflow {
                height: u64::MAX,
                blocks: 1
            }
        );
        assert_eq!(chain.height(), u64::MAX);
        assert!(chain.log().is_empty());
    }

    #[test]
    fn test_deploy_addresses_follow_nonce() {
        let (mut chain, admin, payout) = chain_with_payout();
        assert_eq!(chain.token().address(), contract_address(admin, 0));
        assert_eq!(payout, contract_address(admin, 1));
        let dist = chain
            .deploy_distributor(admin, payout, "mini daily")
            .expect("deploy")
            .value;
        assert_eq!(dist, contract_address(admin, 2));
        assert_eq!(chain.distributor(dist).map(|d| d.name()), Ok("mini daily"));
    }

    #[test]
    fn test_reverted_transaction_restores_state() {
        let (mut chain, admin, payout) = chain_with_payout();
        let before = chain.token().balance_of(admin);
        let height = chain.height();

        let err = chain
            .call_payout(admin, payout, |p, ctx| {
                p.add_distributor(ctx, named_account("dist"))?;
                // Unconfigured: the deposit fails after the allow-list changed.
                p.distribute(ctx, flex(1))
            })
            .expect_err("should revert");
        assert_eq!(err, ChainError::Payout(PayoutError::StartHeightNotSet));
        assert_eq!(chain.height(), height + 1);
        assert!(!chain
            .payout(payout)
            .expect("payout")
            .is_distributor(named_account("dist")));
        assert_eq!(chain.token().balance_of(admin), before);
        assert!(chain.log().is_empty());
    }

    #[test]
    fn test_distribute_via_distributor() {
        let (mut chain, admin, payout) = chain_with_payout();
        let dist = chain
            .deploy_distributor(admin, payout, "mini daily")
            .expect("deploy")
            .value;
        let start = chain.height();
        chain
            .call_payout(admin, payout, |p, ctx| {
                p.set_start_block_height(ctx, start)?;
                p.set_init_epoch_block_length(ctx, 10)?;
                p.add_distributor(ctx, dist)
            })
            .expect("configure");

        chain.transfer(admin, dist, flex(2)).expect("fund");
        let receipt = chain.distribute_via(admin, dist).expect("distribute");
        assert_eq!(receipt.value, flex(2));
        assert_eq!(receipt.events_named("CallDistribute").count(), 1);
        assert_eq!(receipt.events_named("Transfer").count(), 1);
        assert_eq!(
            chain.payout(payout).map(|p| p.payout_for_epoch(0)),
            Ok(flex(2))
        );

        let err = chain
            .distribute_via(named_account("eve"), dist)
            .expect_err("should fail");
        assert_eq!(err, ChainError::Distributor(DistributorError::NotDelegatee));
    }

    #[test]
    fn test_stake_and_claim() {
        let (mut chain, admin, payout) = chain_with_payout();
        let alice = named_account("alice");
        chain
            .call_payout(admin, payout, |p, ctx| {
                p.set_start_block_height(ctx, 5)?;
                p.set_init_epoch_block_length(ctx, 10)
            })
            .expect("configure");
        chain.stake(alice, flex(4)).expect("stake");
        chain.mine(2).expect("mine");
        chain
            .call_payout(admin, payout, |p, ctx| p.distribute(ctx, flex(6)))
            .expect("distribute");
        assert_eq!(chain.claimable(payout, alice), Ok(U256::ZERO));

        chain.mine(10).expect("mine");
        assert_eq!(chain.current_epoch(payout), Ok(1));
        assert_eq!(chain.claimable(payout, alice), Ok(flex(6)));
        let receipt = chain
            .call_payout(alice, payout, |p, ctx| p.claim(ctx, alice))
            .expect("claim");
        assert_eq!(receipt.value, flex(6));
        assert_eq!(chain.token().balance_of(alice), flex(6));
        assert_eq!(chain.claimable(payout, alice), Ok(U256::ZERO));
    }

    #[test]
    fn test_unknown_contract() {
        let (mut chain, admin, _) = chain_with_payout();
        let nowhere = named_account("nowhere");
        assert_eq!(
            chain.current_epoch(nowhere),
            Err(ChainError::UnknownContract(nowhere))
        );
        assert!(chain
            .deploy_distributor(admin, nowhere, "orphan")
            .is_err());
    }
}
