//! # Escrow Lifecycle Tests
//!
//! End-to-end runs of a single escrow against an in-memory ledger and a
//! manual clock:
//! - Funding with a fee, two release/collect cycles, then exhaustion
//! - Closing an unfunded escrow after the timeout
//! - Closing a partially collected escrow
//! - Value conservation across a full lifecycle

use selfescrow_core::{Address, Amount, Timestamp};
use selfescrow_state::{
    Clock, Escrow, EscrowError, EscrowEventKind, EscrowState, EscrowTerms, InMemoryLedger,
    Ledger, ManualClock, CLOSE_TIMEOUT_SECS,
};

const GENESIS: u64 = 1_000_000;

struct Devnet {
    ledger: InMemoryLedger,
    clock: ManualClock,
    owner: Address,
    payer: Address,
    payee: Address,
}

fn devnet() -> Devnet {
    let owner = Address::from_label("account0");
    let payer = Address::from_label("account1");
    let payee = Address::from_label("account2");
    let mut ledger = InMemoryLedger::new();
    for account in [owner, payer, payee] {
        ledger.mint(account, Amount::new(GENESIS)).unwrap();
    }
    Devnet {
        ledger,
        clock: ManualClock::new(Timestamp::parse("2024-06-01T12:00:00Z").unwrap()),
        owner,
        payer,
        payee,
    }
}

fn deploy(net: &Devnet, value: u64, fee: u64) -> Escrow {
    let terms = EscrowTerms {
        owner: net.owner,
        party_from: net.payer,
        party_to: net.payee,
        value: Amount::new(value),
        fee: Amount::new(fee),
    };
    Escrow::deploy(terms, 0, &net.clock).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Fund, release and collect to exhaustion
// ---------------------------------------------------------------------------

#[test]
fn fund_release_collect_to_exhaustion() {
    let mut net = devnet();
    let mut escrow = deploy(&net, 100, 1);

    escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(101))
        .unwrap();
    assert_eq!(net.ledger.balance(&net.owner), Amount::new(GENESIS + 1));
    assert_eq!(escrow.custodial_balance(&net.ledger), Amount::new(100));

    let err = escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(101))
        .unwrap_err();
    assert_eq!(err, EscrowError::Already);

    for round in 1..=2u64 {
        escrow.release(&net.clock, &net.payer, Amount::new(50)).unwrap();
        escrow
            .collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(50))
            .unwrap();
        assert_eq!(escrow.collected(), Amount::new(50 * round));
        assert_eq!(
            net.ledger.balance(&net.payee),
            Amount::new(GENESIS + 50 * round)
        );
    }

    assert_eq!(escrow.collected(), escrow.value());
    assert_eq!(escrow.custodial_balance(&net.ledger), Amount::ZERO);

    let err = escrow
        .collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(1))
        .unwrap_err();
    assert_eq!(err, EscrowError::TooMuch);
    assert_eq!(err.to_string(), "E_TOO_MUCH");

    escrow.verify_invariants(&net.ledger).unwrap();
    assert_eq!(net.ledger.balance(&net.payer), Amount::new(GENESIS - 101));
}

// ---------------------------------------------------------------------------
// 2. Close an unfunded escrow
// ---------------------------------------------------------------------------

#[test]
fn close_unfunded_then_everything_is_closed() {
    let mut net = devnet();
    let mut escrow = deploy(&net, 100, 1);
    let before = net.ledger.clone();

    net.clock.advance(CLOSE_TIMEOUT_SECS).unwrap();
    let event = escrow.close(&mut net.ledger, &net.clock, &net.owner).unwrap();
    assert_eq!(event.kind, EscrowEventKind::Closed);
    assert_eq!(event.amount, Amount::ZERO);
    assert_eq!(net.ledger, before);
    assert_eq!(escrow.state(), EscrowState::Closed);

    let fund = escrow.fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(101));
    let release = escrow.release(&net.clock, &net.payer, Amount::new(1));
    let collect = escrow.collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(1));
    let close = escrow.close(&mut net.ledger, &net.clock, &net.owner);
    for result in [fund, release, collect, close] {
        assert_eq!(result.unwrap_err(), EscrowError::Closed);
    }
    assert_eq!(net.ledger, before);
}

// ---------------------------------------------------------------------------
// 3. Close a partially collected escrow
// ---------------------------------------------------------------------------

#[test]
fn close_returns_uncollected_value_to_owner() {
    let mut net = devnet();
    let mut escrow = deploy(&net, 100, 1);

    escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(101))
        .unwrap();
    escrow.release(&net.clock, &net.payer, Amount::new(70)).unwrap();
    escrow
        .collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(40))
        .unwrap();

    net.clock.advance(CLOSE_TIMEOUT_SECS - 1).unwrap();
    let err = escrow
        .close(&mut net.ledger, &net.clock, &net.owner)
        .unwrap_err();
    assert_eq!(err, EscrowError::TooSoon);

    net.clock.advance(1).unwrap();
    escrow.close(&mut net.ledger, &net.clock, &net.owner).unwrap();

    // Fee (1) plus the uncollected remainder (60).
    assert_eq!(net.ledger.balance(&net.owner), Amount::new(GENESIS + 61));
    assert_eq!(net.ledger.balance(&net.payee), Amount::new(GENESIS + 40));
    assert_eq!(escrow.custodial_balance(&net.ledger), Amount::ZERO);
    escrow.verify_invariants(&net.ledger).unwrap();
}

#[test]
fn timeout_counts_from_deployment_not_funding() {
    let mut net = devnet();
    let mut escrow = deploy(&net, 100, 0);

    net.clock.advance(CLOSE_TIMEOUT_SECS - 10).unwrap();
    escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(100))
        .unwrap();
    net.clock.advance(10).unwrap();

    escrow.close(&mut net.ledger, &net.clock, &net.owner).unwrap();
    assert_eq!(net.ledger.balance(&net.owner), Amount::new(GENESIS + 100));
}

// ---------------------------------------------------------------------------
// 4. Conservation and event log
// ---------------------------------------------------------------------------

#[test]
fn lifecycle_conserves_total_supply() {
    let mut net = devnet();
    let supply = net.ledger.total_supply();
    let mut escrow = deploy(&net, 500, 25);

    escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(525))
        .unwrap();
    escrow.release(&net.clock, &net.payer, Amount::new(200)).unwrap();
    escrow
        .collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(150))
        .unwrap();
    net.clock.advance(CLOSE_TIMEOUT_SECS).unwrap();
    escrow.close(&mut net.ledger, &net.clock, &net.owner).unwrap();

    assert_eq!(net.ledger.total_supply(), supply);
    assert_eq!(escrow.custodial_balance(&net.ledger), Amount::ZERO);
}

#[test]
fn event_log_records_committed_calls_only() {
    let mut net = devnet();
    let mut escrow = deploy(&net, 100, 1);

    escrow
        .fund(&mut net.ledger, &net.clock, &net.payee, Amount::new(101))
        .unwrap_err();
    escrow
        .fund(&mut net.ledger, &net.clock, &net.payer, Amount::new(101))
        .unwrap();
    escrow.release(&net.clock, &net.payer, Amount::new(101)).unwrap_err();
    escrow.release(&net.clock, &net.payer, Amount::new(30)).unwrap();
    net.clock.advance(5).unwrap();
    escrow
        .collect(&mut net.ledger, &net.clock, &net.payee, Amount::new(30))
        .unwrap();

    let kinds: Vec<_> = escrow.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EscrowEventKind::Deployed,
            EscrowEventKind::Funded,
            EscrowEventKind::Released,
            EscrowEventKind::Collected,
        ]
    );
    let last = escrow.events().last().unwrap();
    assert_eq!(last.caller, net.payee);
    assert_eq!(last.timestamp, net.clock.now());
    assert_eq!(last.timestamp.secs_since(&escrow.creation_time()), 5);
}
