//! End-to-end integration tests for the blind auction system.
//!
//! These tests exercise the full auction lifecycle:
//! 1. Auction construction from genesis
//! 2. Bid blinding and submission with deposits
//! 3. Positional reveal
//! 4. Withdrawal of pending returns
//! 5. Settlement to the beneficiary

use auction_client::{BidBuilder, BidVault, PreparedBid, RevealBatch};
use auction_module::{
    handlers, AuctionCall, AuctionError, AuctionGenesisConfig, AuctionState, CallContext,
    CallOutcome, HandlerResult, Ledger,
};
use auction_types::{blind_bid, Address, Amount, Secret, ONE_COIN};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const BENEFICIARY: Address = [0xbe; 32];
const BIDDER1: Address = [0x01; 32];
const BIDDER2: Address = [0x02; 32];

const START: u64 = 1_700_000_000;

/// An auction with a host ledger and a clock, dispatching borsh-encoded calls
/// the way a chain would.
struct Harness {
    auction: AuctionState,
    ledger: Ledger,
    now: u64,
}

impl Harness {
    fn new() -> Self {
        let config = AuctionGenesisConfig::new(BENEFICIARY);
        config.validate().unwrap();
        Self {
            auction: AuctionState::from_genesis(&config, START).unwrap(),
            ledger: Ledger::new(),
            now: START,
        }
    }

    fn fund(&mut self, who: Address, amount: Amount) {
        self.ledger.credit(who, amount).unwrap();
    }

    fn warp_to_reveal(&mut self) {
        self.now = self.auction.bidding_end();
    }

    fn warp_to_settlement(&mut self) {
        self.now = self.auction.reveal_end();
    }

    fn call(&mut self, sender: Address, value: Amount, call: AuctionCall) -> HandlerResult<CallOutcome> {
        let encoded = borsh::to_vec(&call).unwrap();
        let call: AuctionCall = borsh::from_slice(&encoded).unwrap();

        self.ledger.debit(&sender, value).unwrap();
        let ctx = CallContext {
            sender,
            timestamp: self.now,
            value,
        };
        let result = handlers::dispatch(&mut self.auction, &ctx, call, &mut self.ledger);
        if result.is_err() && value > 0 {
            self.ledger.credit(sender, value).unwrap();
        }
        result
    }

    fn bid(&mut self, sender: Address, prepared: &PreparedBid) -> HandlerResult<CallOutcome> {
        self.call(
            sender,
            prepared.deposit,
            AuctionCall::Bid {
                commitment: prepared.commitment,
            },
        )
    }

    fn reveal(&mut self, sender: Address, batch: RevealBatch) -> HandlerResult<CallOutcome> {
        self.call(sender, 0, batch.into_call())
    }

    fn withdraw(&mut self, sender: Address) -> Amount {
        match self.call(sender, 0, AuctionCall::Withdraw) {
            Ok(CallOutcome::Withdrawn { amount }) => amount,
            other => panic!("unexpected withdraw result: {:?}", other),
        }
    }

    /// Deposits of `bidder`'s bids no matching reveal has consumed.
    fn unrevealed_deposits_of(&self, bidder: &Address) -> Amount {
        self.auction
            .get_bids(bidder)
            .iter()
            .filter(|bid| !bid.revealed)
            .map(|bid| bid.deposit)
            .sum()
    }

    /// Funds in the ledger plus funds held by the engine.
    fn total_supply(&self, accounts: &[Address]) -> Amount {
        accounts
            .iter()
            .map(|a| self.ledger.balance_of(a))
            .sum::<Amount>()
            + self.auction.balance()
    }
}

fn labelled(value: Amount, fake: bool, label: &str) -> PreparedBid {
    BidBuilder::new(value)
        .fake(fake)
        .deposit(ONE_COIN.max(value))
        .secret(Secret::from_label(label).unwrap())
        .build(&mut OsRng)
        .unwrap()
}

/// Two honest bidders: 1 ETH then 2 ETH.
fn scenario_a() -> Harness {
    let mut h = Harness::new();
    h.fund(BIDDER1, 10 * ONE_COIN);
    h.fund(BIDDER2, 10 * ONE_COIN);

    let bid1 = labelled(ONE_COIN, false, "secret1");
    let bid2 = labelled(2 * ONE_COIN, false, "secret2");
    h.bid(BIDDER1, &bid1).unwrap();
    h.bid(BIDDER2, &bid2).unwrap();

    h.warp_to_reveal();
    h.reveal(BIDDER1, RevealBatch::from_prepared([&bid1])).unwrap();
    h.reveal(BIDDER2, RevealBatch::from_prepared([&bid2])).unwrap();
    h
}

#[test]
fn test_scenario_outbid_bidder_withdraws() {
    let mut h = scenario_a();

    assert_eq!(h.auction.highest_bidder(), Some(&BIDDER2));
    assert_eq!(h.auction.highest_bid(), 2 * ONE_COIN);
    assert_eq!(h.auction.get_pending_returns(&BIDDER1), ONE_COIN);

    let before = h.ledger.balance_of(&BIDDER1);
    assert_eq!(h.withdraw(BIDDER1), ONE_COIN);
    assert_eq!(h.ledger.balance_of(&BIDDER1) - before, ONE_COIN);

    // Second withdraw transfers nothing.
    assert_eq!(h.withdraw(BIDDER1), 0);
    assert!(h.auction.is_balanced());

    println!("Bidder 1 recovered exactly 1 coin after being outbid");
}

#[test]
fn test_scenario_fake_bid_refunded() {
    let mut h = Harness::new();
    h.fund(BIDDER1, 10 * ONE_COIN);

    let decoy = labelled(ONE_COIN, true, "secret1");
    assert_eq!(
        hex::encode(decoy.commitment.0),
        "c89092f7bbc3b3cc144460d31851f0a03d441e6f44df636ed0639941d01095f7"
    );
    h.bid(BIDDER1, &decoy).unwrap();

    h.warp_to_reveal();
    h.reveal(BIDDER1, RevealBatch::from_prepared([&decoy])).unwrap();

    assert!(h.auction.highest_bidder().is_none());
    assert_eq!(h.auction.highest_bid(), 0);
    assert_eq!(h.withdraw(BIDDER1), ONE_COIN);
    assert_eq!(h.ledger.balance_of(&BIDDER1), 10 * ONE_COIN);
}

#[test]
fn test_scenario_settlement_pays_beneficiary() {
    let mut h = scenario_a();

    let early = h.call(BIDDER1, 0, AuctionCall::AuctionEnd);
    assert_eq!(
        early,
        Err(AuctionError::TooEarly {
            deadline: h.auction.reveal_end()
        })
    );

    h.warp_to_settlement();
    let outcome = h.call(BIDDER1, 0, AuctionCall::AuctionEnd).unwrap();

    assert_eq!(outcome, CallOutcome::Ended { amount: 2 * ONE_COIN });
    assert_eq!(h.ledger.balance_of(&BENEFICIARY), 2 * ONE_COIN);
    assert!(h.auction.ended());

    let again = h.call(BIDDER2, 0, AuctionCall::AuctionEnd);
    assert_eq!(again, Err(AuctionError::AuctionEndAlreadyCalled));
    assert_eq!(h.ledger.balance_of(&BENEFICIARY), 2 * ONE_COIN);

    // Losers can still withdraw after the end.
    assert_eq!(h.withdraw(BIDDER1), ONE_COIN);
    assert_eq!(h.auction.balance(), 0);
    assert!(h.auction.is_balanced());
}

#[test]
fn test_late_calls_leave_state_unchanged() {
    let mut h = scenario_a();
    h.fund(BIDDER1, ONE_COIN);
    let events = h.auction.events().len();
    let held = h.auction.balance();

    let late_bid = labelled(ONE_COIN, false, "late");
    assert!(matches!(
        h.bid(BIDDER1, &late_bid),
        Err(AuctionError::TooLate { .. })
    ));

    h.warp_to_settlement();
    let late_reveal = h.reveal(BIDDER1, RevealBatch::from_prepared([&late_bid]));
    assert!(matches!(late_reveal, Err(AuctionError::TooLate { .. })));

    assert_eq!(h.auction.events().len(), events);
    assert_eq!(h.auction.balance(), held);
    assert_eq!(h.ledger.balance_of(&BIDDER1), 10 * ONE_COIN);
}

#[test]
fn test_vault_driven_reveal_with_decoys() {
    let path = std::env::temp_dir().join(format!("auction-it-vault-{}.json", std::process::id()));
    let mut h = Harness::new();
    h.fund(BIDDER1, 20 * ONE_COIN);
    h.fund(BIDDER2, 20 * ONE_COIN);

    let mut vault = BidVault::open(&path).unwrap();
    let plans = [
        (BIDDER1, 5 * ONE_COIN, true, 5 * ONE_COIN),
        (BIDDER1, 3 * ONE_COIN, false, 4 * ONE_COIN),
        (BIDDER2, 4 * ONE_COIN, false, 4 * ONE_COIN),
        (BIDDER1, ONE_COIN, false, ONE_COIN),
    ];
    for (bidder, value, fake, deposit) in plans {
        let prepared = BidBuilder::new(value)
            .fake(fake)
            .deposit(deposit)
            .build(&mut OsRng)
            .unwrap();
        let index = match h.bid(bidder, &prepared).unwrap() {
            CallOutcome::Committed { index } => index,
            other => panic!("unexpected outcome: {:?}", other),
        };
        vault.record(bidder, index, prepared);
    }
    vault.save().unwrap();

    let vault = BidVault::open(&path).unwrap();
    h.warp_to_reveal();
    for bidder in [BIDDER1, BIDDER2] {
        let batch = vault.reveal_batch(&bidder);
        assert!(batch.mismatches(h.auction.get_bids(&bidder)).is_empty());
        h.reveal(bidder, batch).unwrap();
    }

    assert_eq!(h.auction.highest_bidder(), Some(&BIDDER2));
    assert_eq!(h.auction.highest_bid(), 4 * ONE_COIN);
    // decoy 5 + excess 1 on the 3-coin bid + displaced 3 + unplaced 1
    assert_eq!(h.auction.get_pending_returns(&BIDDER1), 10 * ONE_COIN);
    assert!(h.auction.is_balanced());

    h.warp_to_settlement();
    h.call(BIDDER2, 0, AuctionCall::AuctionEnd).unwrap();
    assert_eq!(h.withdraw(BIDDER1), 10 * ONE_COIN);
    assert_eq!(h.ledger.balance_of(&BIDDER1), 20 * ONE_COIN);
    assert_eq!(h.ledger.balance_of(&BIDDER2), 16 * ONE_COIN);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_mismatched_reveal_forfeits_deposit() {
    let mut h = Harness::new();
    h.fund(BIDDER1, 5 * ONE_COIN);

    let commitment = blind_bid(ONE_COIN, false, &Secret::from_label("right").unwrap());
    h.call(BIDDER1, 2 * ONE_COIN, AuctionCall::Bid { commitment }).unwrap();

    h.warp_to_reveal();
    let outcome = h
        .call(
            BIDDER1,
            0,
            AuctionCall::Reveal {
                values: vec![ONE_COIN],
                fakes: vec![false],
                secrets: vec![Secret::from_label("wrong").unwrap()],
            },
        )
        .unwrap();

    match outcome {
        CallOutcome::Revealed(r) => {
            assert_eq!(r.accepted, 0);
            assert_eq!(r.skipped, 1);
            assert_eq!(r.credited, 0);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    h.warp_to_settlement();
    h.call(BIDDER1, 0, AuctionCall::AuctionEnd).unwrap();

    assert_eq!(h.withdraw(BIDDER1), 0);
    assert_eq!(h.auction.unrevealed_deposits(), 2 * ONE_COIN);
    assert_eq!(h.auction.balance(), 2 * ONE_COIN);
    assert_eq!(h.ledger.balance_of(&BENEFICIARY), 0);
    assert!(h.auction.is_balanced());
}

/// Deposits and withdrawals made by each bidder during a run.
#[derive(Default)]
struct BidderFlows {
    deposited: HashMap<Address, Amount>,
    withdrawn: HashMap<Address, Amount>,
}

impl BidderFlows {
    fn deposit(&mut self, bidder: Address, amount: Amount) {
        *self.deposited.entry(bidder).or_default() += amount;
    }

    fn withdraw(&mut self, bidder: Address, amount: Amount) {
        *self.withdrawn.entry(bidder).or_default() += amount;
    }

    /// Every unit a bidder deposited is withdrawn, pending, locked as their
    /// leading bid, or still sitting in one of their unrevealed bids.
    fn assert_accounted(&self, h: &Harness, bidders: &[Address], round: usize) {
        for bidder in bidders {
            let deposited = self.deposited.get(bidder).copied().unwrap_or(0);
            let withdrawn = self.withdrawn.get(bidder).copied().unwrap_or(0);
            let leading = if h.auction.highest_bidder() == Some(bidder) {
                h.auction.highest_bid()
            } else {
                0
            };
            assert_eq!(
                deposited,
                withdrawn
                    + h.auction.get_pending_returns(bidder)
                    + leading
                    + h.unrevealed_deposits_of(bidder),
                "round {}: bidder {} funds unaccounted",
                round,
                hex::encode(bidder)
            );
        }
    }
}

#[test]
fn test_conservation_randomized() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let bidders: Vec<Address> = (1..=6u8).map(|i| [i; 32]).collect();
    let mut accounts = bidders.clone();
    accounts.push(BENEFICIARY);

    for round in 0..20 {
        let mut h = Harness::new();
        for bidder in &bidders {
            h.fund(*bidder, 1_000 * ONE_COIN);
        }
        let supply = h.total_supply(&accounts);
        let mut placed: Vec<(Address, PreparedBid)> = Vec::new();
        let mut flows = BidderFlows::default();

        // Bidding
        for _ in 0..rng.gen_range(1..15) {
            let bidder = bidders[rng.gen_range(0..bidders.len())];
            let value = rng.gen_range(1..50) * ONE_COIN;
            let fake = rng.gen_bool(0.3);
            let deposit = if fake {
                rng.gen_range(1..50) * ONE_COIN
            } else {
                value + rng.gen_range(0..5) * ONE_COIN
            };
            let prepared = BidBuilder::new(value)
                .fake(fake)
                .deposit(deposit)
                .build(&mut rng)
                .unwrap();
            h.bid(bidder, &prepared).unwrap();
            flows.deposit(bidder, prepared.deposit);
            placed.push((bidder, prepared));

            assert!(h.auction.is_balanced(), "round {}: unbalanced while bidding", round);
            flows.assert_accounted(&h, &bidders, round);
            assert_eq!(h.total_supply(&accounts), supply);
        }

        // Revealing, with some bidders corrupting or skipping their reveals
        h.warp_to_reveal();
        let mut last_high = 0;
        for bidder in &bidders {
            let mine: Vec<&PreparedBid> = placed
                .iter()
                .filter(|(b, _)| b == bidder)
                .map(|(_, p)| p)
                .collect();
            if mine.is_empty() || rng.gen_bool(0.15) {
                continue;
            }
            let mut batch = RevealBatch::from_prepared(mine.iter().copied());
            if rng.gen_bool(0.2) {
                let i = rng.gen_range(0..batch.len());
                batch.secrets[i].0[31] ^= 0xff;
            }
            h.reveal(*bidder, batch).unwrap();

            assert!(h.auction.highest_bid() >= last_high);
            last_high = h.auction.highest_bid();
            assert!(h.auction.is_balanced(), "round {}: unbalanced while revealing", round);
            flows.assert_accounted(&h, &bidders, round);

            if rng.gen_bool(0.5) {
                let amount = h.withdraw(*bidder);
                flows.withdraw(*bidder, amount);
                assert!(h.auction.is_balanced());
                flows.assert_accounted(&h, &bidders, round);
            }
            assert_eq!(h.total_supply(&accounts), supply);
        }

        // Settlement and final withdrawals
        h.warp_to_settlement();
        h.call(bidders[0], 0, AuctionCall::AuctionEnd).unwrap();
        flows.assert_accounted(&h, &bidders, round);
        for bidder in &bidders {
            let amount = h.withdraw(*bidder);
            flows.withdraw(*bidder, amount);
        }

        assert!(h.auction.is_balanced());
        flows.assert_accounted(&h, &bidders, round);
        for bidder in &bidders {
            assert_eq!(h.auction.get_pending_returns(bidder), 0);
        }
        assert_eq!(h.auction.balance(), h.auction.unrevealed_deposits());
        assert_eq!(h.ledger.balance_of(&BENEFICIARY), h.auction.highest_bid());
        assert_eq!(h.total_supply(&accounts), supply);
    }
}
