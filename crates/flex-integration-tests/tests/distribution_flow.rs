//! Integration test: deposits and pro-rata claims across many epochs.
//!
//! Exercises the reward lifecycle end to end:
//! 1. Deposit one FLEX per epoch over ten epochs through a distributor
//! 2. Verify each epoch's bucket and the current epoch
//! 3. Stake mid-epoch and verify that epoch pays nothing
//! 4. Claim a multi-epoch, multi-account split and verify the shares
//! 5. Verify claims are idempotent until another epoch elapses
//!
//! This test uses flex-chain, flex-payout, flex-distributor and flex-types.

use flex_chain::Chain;
use flex_payout::PayoutKind;
use flex_types::events::Event;
use flex_types::{flex, named_account, Address, U256};

const EPOCH_BLOCKS: u64 = 10;

/// Helper: configured payout engine with an allow-listed distributor.
fn setup() -> (Chain, Address, Address, Address) {
    let admin = named_account("admin");
    let mut chain = Chain::new(admin, flex(1_000_000)).expect("chain");
    let payout = chain
        .deploy_payout(admin, PayoutKind::Custom(EPOCH_BLOCKS))
        .expect("deploy payout")
        .value;
    let distributor = chain
        .deploy_distributor(admin, payout, "mini daily")
        .expect("deploy distributor")
        .value;
    let start = chain.height();
    chain
        .call_payout(admin, payout, |p, ctx| {
            p.set_start_block_height(ctx, start)?;
            p.set_init_epoch_block_length(ctx, EPOCH_BLOCKS)?;
            p.add_distributor(ctx, distributor)
        })
        .expect("configure");
    (chain, admin, payout, distributor)
}

/// Helper: fund the distributor and forward it, two blocks in total.
fn deposit(chain: &mut Chain, admin: Address, distributor: Address, amount: U256) {
    chain.transfer(admin, distributor, amount).expect("fund");
    chain.distribute_via(admin, distributor).expect("distribute");
}

#[test]
fn ten_epochs_of_deposits() {
    let (mut chain, admin, payout, distributor) = setup();

    for epoch in 0..10 {
        assert_eq!(chain.current_epoch(payout), Ok(epoch));
        deposit(&mut chain, admin, distributor, flex(1));
        chain.mine(EPOCH_BLOCKS - 2).expect("mine");
    }

    assert_eq!(chain.current_epoch(payout), Ok(10));
    let engine = chain.payout(payout).expect("payout");
    for epoch in 0..10 {
        assert_eq!(engine.payout_for_epoch(epoch), flex(1), "epoch {epoch}");
    }
    assert_eq!(engine.total_deposited(), flex(10));
    assert_eq!(chain.token().balance_of(payout), flex(10));

    let calls = chain
        .log()
        .iter()
        .filter(|log| log.emitter == payout && log.event.name() == "CallDistribute")
        .count();
    assert_eq!(calls, 10);
}

#[test]
fn stake_mid_epoch_earns_from_next_epoch() {
    let (mut chain, admin, payout, distributor) = setup();
    let alice = named_account("alice");

    // =========================================================
    // Epoch 0: stake after the start height, then deposit
    // =========================================================
    chain.stake(alice, flex(10)).expect("stake");
    deposit(&mut chain, admin, distributor, flex(1));
    chain.mine(EPOCH_BLOCKS).expect("mine");
    assert_eq!(chain.current_epoch(payout), Ok(1));
    assert_eq!(chain.claimable(payout, alice), Ok(U256::ZERO));

    // =========================================================
    // Epoch 1: alice holds all voting power at its start
    // =========================================================
    deposit(&mut chain, admin, distributor, flex(1));
    assert_eq!(chain.claimable(payout, alice), Ok(U256::ZERO));
    chain.mine(EPOCH_BLOCKS).expect("mine");
    assert_eq!(chain.claimable(payout, alice), Ok(flex(1)));

    let receipt = chain
        .call_payout(alice, payout, |p, ctx| p.claim(ctx, alice))
        .expect("claim");
    assert_eq!(receipt.value, flex(1));
    assert_eq!(
        receipt.events_named("Claim").next(),
        Some(&Event::Claim {
            account: alice,
            amount: flex(1)
        })
    );
}

#[test]
fn multi_account_split() {
    let (mut chain, admin, payout, distributor) = setup();
    let alice = named_account("alice");
    let bob = named_account("bob");
    let carol = named_account("carol");

    chain.stake(alice, flex(30)).expect("stake");
    chain.stake(bob, flex(10)).expect("stake");
    chain.mine(EPOCH_BLOCKS).expect("mine");

    // Epoch 1: alice 30, bob 10.
    deposit(&mut chain, admin, distributor, flex(8));
    chain.stake(bob, flex(30)).expect("restake");
    chain.stake(carol, flex(20)).expect("stake");
    chain.mine(EPOCH_BLOCKS).expect("mine");

    // Epoch 2: alice 30, bob 30, carol 20.
    deposit(&mut chain, admin, distributor, flex(16));
    chain.mine(EPOCH_BLOCKS).expect("mine");
    assert_eq!(chain.current_epoch(payout), Ok(3));

    assert_eq!(chain.claimable(payout, alice), Ok(flex(6) + flex(6)));
    assert_eq!(chain.claimable(payout, bob), Ok(flex(2) + flex(6)));
    assert_eq!(chain.claimable(payout, carol), Ok(flex(4)));

    for account in [alice, bob, carol] {
        chain
            .call_payout(account, payout, |p, ctx| p.claim(ctx, account))
            .expect("claim");
    }
    assert_eq!(chain.token().balance_of(alice), flex(12));
    assert_eq!(chain.token().balance_of(bob), flex(8));
    assert_eq!(chain.token().balance_of(carol), flex(4));
    assert_eq!(chain.token().balance_of(payout), U256::ZERO);

    let reports = chain
        .epoch_reports(admin, payout, &[alice, bob, carol])
        .expect("reports");
    // The claim blocks moved the chain into epoch 4.
    assert_eq!(reports.len(), 5);
    assert_eq!(reports[2].total_supply, flex(80));
    assert_eq!(reports[2].shares[2].reward, flex(4));
    let json = serde_json::to_value(&reports[1]).expect("serialize");
    assert_eq!(json["epoch"], 1);
}

#[test]
fn claim_is_idempotent_until_next_epoch() {
    let (mut chain, admin, payout, distributor) = setup();
    let alice = named_account("alice");
    let relayer = named_account("relayer");

    chain.stake(alice, flex(1)).expect("stake");
    chain.mine(EPOCH_BLOCKS).expect("mine");
    deposit(&mut chain, admin, distributor, flex(5));
    chain.mine(EPOCH_BLOCKS).expect("mine");

    // Anyone may trigger the claim; funds go to the account.
    let first = chain
        .call_payout(relayer, payout, |p, ctx| p.claim(ctx, alice))
        .expect("claim");
    assert_eq!(first.value, flex(5));
    assert_eq!(chain.token().balance_of(relayer), U256::ZERO);

    let second = chain
        .call_payout(alice, payout, |p, ctx| p.claim(ctx, alice))
        .expect("claim again");
    assert_eq!(second.value, U256::ZERO);
    assert!(second.events.is_empty());
    assert_eq!(chain.token().balance_of(alice), flex(5));

    // A new elapsed epoch with no deposit still pays nothing.
    chain.mine(EPOCH_BLOCKS).expect("mine");
    let third = chain
        .call_payout(alice, payout, |p, ctx| p.claim(ctx, alice))
        .expect("claim after empty epoch");
    assert_eq!(third.value, U256::ZERO);
    assert_eq!(
        chain.payout(payout).map(|p| p.next_unclaimed_epoch(alice)),
        Ok(3)
    );
}

#[test]
fn zero_supply_epoch_pays_nothing() {
    let (mut chain, admin, payout, distributor) = setup();
    let alice = named_account("alice");

    deposit(&mut chain, admin, distributor, flex(3));
    chain.mine(EPOCH_BLOCKS).expect("mine");
    assert_eq!(chain.claimable(payout, alice), Ok(U256::ZERO));

    let receipt = chain
        .call_payout(alice, payout, |p, ctx| p.claim(ctx, alice))
        .expect("claim");
    assert_eq!(receipt.value, U256::ZERO);
    // Unclaimable rewards stay with the engine.
    assert_eq!(chain.token().balance_of(payout), flex(3));
}
