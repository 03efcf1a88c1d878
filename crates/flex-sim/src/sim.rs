//! Scenario execution against a fresh chain.

use std::collections::BTreeMap;

use flex_chain::{Chain, ChainError};
use flex_payout::{EpochReport, PayoutKind};
use flex_types::{flex, named_account, Address, Amount, BlockHeight, EpochIndex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::scenario::{Scenario, Step};

/// A step that reverted.
#[derive(Debug, Clone, Serialize)]
pub struct RevertedStep {
    /// Position in the scenario.
    pub index: usize,
    pub action: &'static str,
    pub block: BlockHeight,
    pub error: String,
}

/// Final simulator output.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub height: BlockHeight,
    pub current_epoch: EpochIndex,
    pub token: Address,
    pub token_symbol: String,
    /// Total FLEX in existence, in wei.
    pub token_supply: Amount,
    pub payout: Address,
    pub payout_kind: PayoutKind,
    pub distributor: Address,
    /// Distributors the payout engine accepts deposits from.
    pub allow_listed: Vec<Address>,
    /// FLEX held per labelled account.
    pub balances: BTreeMap<String, Amount>,
    /// Amount each labelled account could claim now.
    pub claimable: BTreeMap<String, Amount>,
    pub epochs: Vec<EpochReport>,
    pub reverted: Vec<RevertedStep>,
}

/// A chain with one payout engine and one distributor deployed.
pub struct Simulation {
    chain: Chain,
    admin: Address,
    payout: Address,
    distributor: Address,
    labels: BTreeMap<String, Address>,
    report_accounts: Vec<String>,
    reverted: Vec<RevertedStep>,
}

impl Simulation {
    /// Deploy and configure the contracts described by `config`.
    pub fn new(config: &SimConfig) -> anyhow::Result<Self> {
        let admin = named_account(&config.chain.admin);
        let mut chain = Chain::new(admin, flex(config.chain.supply_flex))?;
        let payout = chain.deploy_payout(admin, config.payout.kind)?.value;
        let distributor = chain
            .deploy_distributor(admin, payout, &config.distributor.name)?
            .value;

        chain.mine(config.payout.start_offset)?;
        let start = chain.height();
        let length = config.init_epoch_length();
        chain.call_payout(admin, payout, |p, ctx| {
            p.set_start_block_height(ctx, start)?;
            p.set_init_epoch_block_length(ctx, length)?;
            p.add_distributor(ctx, distributor)
        })?;

        let mut labels = BTreeMap::new();
        labels.insert(config.chain.admin.clone(), admin);
        for label in &config.distributor.delegatees {
            let delegatee = named_account(label);
            labels.insert(label.clone(), delegatee);
            chain.call_distributor(admin, distributor, |d, ctx| d.add_distributor(ctx, delegatee))?;
        }

        info!(%payout, %distributor, start, length, "simulation ready");
        Ok(Self {
            chain,
            admin,
            payout,
            distributor,
            labels,
            report_accounts: config.report.accounts.clone(),
            reverted: Vec::new(),
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    fn account(&mut self, label: &str) -> Address {
        *self
            .labels
            .entry(label.to_string())
            .or_insert_with(|| named_account(label))
    }

    /// Run every step. Reverted steps are recorded and do not stop the run.
    pub fn run(&mut self, scenario: &Scenario) {
        for (index, step) in scenario.steps.iter().enumerate() {
            if let Err(e) = self.apply(step) {
                warn!(index, action = step.action(), error = %e, "step reverted");
                self.reverted.push(RevertedStep {
                    index,
                    action: step.action(),
                    block: self.chain.height(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Execute one step.
    pub fn apply(&mut self, step: &Step) -> Result<(), ChainError> {
        debug!(action = step.action(), height = self.chain.height(), "applying step");
        let admin = self.admin;
        let payout = self.payout;
        let distributor = self.distributor;

        match step {
            Step::Mine { blocks } => {
                self.chain.mine(*blocks)?;
            }
            Step::Fund { account, flex: whole } => {
                let to = self.account(account);
                self.chain.transfer(admin, to, flex(*whole))?;
            }
            Step::FundDistributor { flex: whole } => {
                self.chain.transfer(admin, distributor, flex(*whole))?;
            }
            Step::Transfer {
                from,
                to,
                flex: whole,
            } => {
                let from = self.account(from);
                let to = self.account(to);
                self.chain.transfer(from, to, flex(*whole))?;
            }
            Step::Stake {
                account,
                flex: whole,
            } => {
                let account = self.account(account);
                self.chain.stake(account, flex(*whole))?;
            }
            Step::Distribute { caller } => {
                let caller = match caller {
                    Some(label) => self.account(label),
                    None => admin,
                };
                self.chain.distribute_via(caller, distributor)?;
            }
            Step::DirectDistribute { flex: whole } => {
                let amount = flex(*whole);
                self.chain
                    .call_payout(admin, payout, |p, ctx| p.distribute(ctx, amount))?;
            }
            Step::Claim { account, caller } => {
                let account = self.account(account);
                let caller = match caller {
                    Some(label) => self.account(label),
                    None => account,
                };
                self.chain
                    .call_payout(caller, payout, |p, ctx| p.claim(ctx, account))?;
            }
            Step::SetNextEpochLength { length } => {
                let length = *length;
                self.chain
                    .call_payout(admin, payout, |p, ctx| p.set_next_epoch_length(ctx, length))?;
            }
            Step::UpdateLastEpochLength { length } => {
                let length = *length;
                self.chain.call_payout(admin, payout, |p, ctx| {
                    p.update_last_epoch_length(ctx, length)
                })?;
            }
            Step::AddDelegatee { account } => {
                let delegatee = self.account(account);
                self.chain.call_distributor(admin, distributor, |d, ctx| {
                    d.add_distributor(ctx, delegatee)
                })?;
            }
            Step::AddOperator { account } => {
                let operator = self.account(account);
                self.chain
                    .call_payout(admin, payout, |p, ctx| p.add_operator(ctx, operator))?;
            }
            Step::RevertTransfer { to, flex: whole } => {
                let to = self.account(to);
                let amount = whole.map(flex);
                self.chain.call_distributor(admin, distributor, |d, ctx| {
                    d.revert_transfer(ctx, to, amount)
                })?;
            }
        }
        Ok(())
    }

    /// Snapshot of balances, claimables and per-epoch breakdowns.
    pub fn report(&mut self) -> anyhow::Result<SimReport> {
        let labels: Vec<String> = self.report_accounts.clone();
        let accounts: Vec<Address> = labels.iter().map(|l| self.account(l)).collect();

        let mut balances = BTreeMap::new();
        let mut claimable = BTreeMap::new();
        for (label, &address) in &self.labels {
            balances.insert(label.clone(), self.chain.token().balance_of(address));
        }
        for (label, &address) in labels.iter().zip(&accounts) {
            claimable.insert(label.clone(), self.chain.claimable(self.payout, address)?);
        }

        let engine = self.chain.payout(self.payout)?;
        let token = self.chain.token();
        Ok(SimReport {
            height: self.chain.height(),
            current_epoch: self.chain.current_epoch(self.payout)?,
            token: token.address(),
            token_symbol: token.symbol().to_string(),
            token_supply: token.total_supply(),
            payout: self.payout,
            payout_kind: engine.kind(),
            distributor: self.distributor,
            allow_listed: engine.distributors().copied().collect(),
            balances,
            claimable,
            epochs: self.chain.epoch_reports(self.admin, self.payout, &accounts)?,
            reverted: self.reverted.clone(),
        })
    }
}
