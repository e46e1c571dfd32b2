//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state.

use crate::events::AuctionEvent;
use crate::state::AuctionState;
use auction_types::{commitments_digest, Address, Amount, AuctionPhase, Bid};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, DisplayFromStr};

/// Query request types.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQuery {
    Beneficiary,
    BiddingEnd,
    RevealEnd,
    HighestBidder,
    HighestBid,
    Ended,

    /// Phase at the given time.
    Phase { now: u64 },

    /// Get a specific bid.
    Bid {
        #[serde_as(as = "Hex")]
        bidder: Address,
        index: usize,
    },

    /// Get all bids of a bidder.
    Bids {
        #[serde_as(as = "Hex")]
        bidder: Address,
    },

    /// Get an address's reclaimable balance.
    PendingReturns {
        #[serde_as(as = "Hex")]
        address: Address,
    },

    /// Digest over a bidder's commitments, in order.
    CommitmentsDigest {
        #[serde_as(as = "Hex")]
        bidder: Address,
    },

    /// Get events (paginated).
    Events { offset: usize, limit: usize },

    /// Get a snapshot of the whole auction.
    Summary { now: u64 },
}

/// Query response types.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Address(#[serde_as(as = "Hex")] Address),
    Timestamp(u64),
    Bidder(#[serde_as(as = "Option<Hex>")] Option<Address>),
    Amount(#[serde_as(as = "DisplayFromStr")] Amount),
    Flag(bool),
    Phase(AuctionPhase),
    Bid(Option<Bid>),
    Bids(Vec<Bid>),
    Digest(#[serde_as(as = "Hex")] [u8; 32]),
    Events(Vec<AuctionEvent>),
    Summary(AuctionSummary),
}

/// Handle a query.
pub fn handle_query(state: &AuctionState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::Beneficiary => AuctionQueryResponse::Address(state.beneficiary),
        AuctionQuery::BiddingEnd => AuctionQueryResponse::Timestamp(state.bidding_end),
        AuctionQuery::RevealEnd => AuctionQueryResponse::Timestamp(state.reveal_end),
        AuctionQuery::HighestBidder => AuctionQueryResponse::Bidder(state.highest_bidder),
        AuctionQuery::HighestBid => AuctionQueryResponse::Amount(state.highest_bid),
        AuctionQuery::Ended => AuctionQueryResponse::Flag(state.ended),
        AuctionQuery::Phase { now } => AuctionQueryResponse::Phase(state.phase(now)),

        AuctionQuery::Bid { bidder, index } => {
            AuctionQueryResponse::Bid(state.get_bid(&bidder, index).cloned())
        }

        AuctionQuery::Bids { bidder } => AuctionQueryResponse::Bids(state.get_bids(&bidder).to_vec()),

        AuctionQuery::PendingReturns { address } => {
            AuctionQueryResponse::Amount(state.get_pending_returns(&address))
        }

        AuctionQuery::CommitmentsDigest { bidder } => {
            let digest = commitments_digest(state.get_bids(&bidder).iter().map(|bid| &bid.commitment));
            AuctionQueryResponse::Digest(digest)
        }

        AuctionQuery::Events { offset, limit } => {
            AuctionQueryResponse::Events(get_events(state, offset, limit))
        }

        AuctionQuery::Summary { now } => {
            AuctionQueryResponse::Summary(AuctionSummary::from_state(state, now))
        }
    }
}

/// Snapshot of an auction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    #[serde_as(as = "Hex")]
    pub beneficiary: Address,
    pub bidding_end: u64,
    pub reveal_end: u64,
    pub phase: AuctionPhase,
    #[serde_as(as = "Option<Hex>")]
    pub highest_bidder: Option<Address>,
    #[serde_as(as = "DisplayFromStr")]
    pub highest_bid: Amount,
    pub ended: bool,
    /// Funds held by the engine
    #[serde_as(as = "DisplayFromStr")]
    pub balance: Amount,
    #[serde_as(as = "DisplayFromStr")]
    pub total_pending_returns: Amount,
    /// Deposits not yet opened; forfeited once revealing closes
    #[serde_as(as = "DisplayFromStr")]
    pub unrevealed_deposits: Amount,
    pub num_bidders: usize,
    pub num_bids: usize,
    pub num_events: usize,
}

impl AuctionSummary {
    /// Create summary from state at `now`.
    pub fn from_state(state: &AuctionState, now: u64) -> Self {
        Self {
            beneficiary: state.beneficiary,
            bidding_end: state.bidding_end,
            reveal_end: state.reveal_end,
            phase: state.phase(now),
            highest_bidder: state.highest_bidder,
            highest_bid: state.highest_bid,
            ended: state.ended,
            balance: state.balance,
            total_pending_returns: state.total_pending_returns(),
            unrevealed_deposits: state.unrevealed_deposits(),
            num_bidders: state.bidder_count(),
            num_bids: state.bids.values().map(Vec::len).sum(),
            num_events: state.events.len(),
        }
    }
}

/// Get events for listing.
pub fn get_events(state: &AuctionState, offset: usize, limit: usize) -> Vec<AuctionEvent> {
    state
        .events
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{handle_bid, handle_reveal, CallContext};
    use auction_types::{blind_bid, Secret, ONE_COIN};

    const BIDDER: Address = [7u8; 32];

    fn populated_state() -> AuctionState {
        let mut state = AuctionState::new([1u8; 32], 0, 100, 100).unwrap();
        let secret = Secret::from_label("s").unwrap();
        for (value, deposit) in [(ONE_COIN, ONE_COIN), (2 * ONE_COIN, ONE_COIN)] {
            let ctx = CallContext {
                sender: BIDDER,
                timestamp: 1,
                value: deposit,
            };
            handle_bid(&mut state, &ctx, blind_bid(value, false, &secret)).unwrap();
        }
        state
    }

    #[test]
    fn test_scalar_queries() {
        let state = populated_state();

        assert_eq!(
            handle_query(&state, AuctionQuery::Beneficiary),
            AuctionQueryResponse::Address([1u8; 32])
        );
        assert_eq!(
            handle_query(&state, AuctionQuery::RevealEnd),
            AuctionQueryResponse::Timestamp(200)
        );
        assert_eq!(
            handle_query(&state, AuctionQuery::HighestBidder),
            AuctionQueryResponse::Bidder(None)
        );
        assert_eq!(
            handle_query(&state, AuctionQuery::Phase { now: 150 }),
            AuctionQueryResponse::Phase(AuctionPhase::Revealing)
        );
    }

    #[test]
    fn test_bid_queries() {
        let state = populated_state();

        let response = handle_query(&state, AuctionQuery::Bids { bidder: BIDDER });
        assert!(matches!(response, AuctionQueryResponse::Bids(ref bids) if bids.len() == 2));

        let response = handle_query(
            &state,
            AuctionQuery::Bid {
                bidder: BIDDER,
                index: 5,
            },
        );
        assert_eq!(response, AuctionQueryResponse::Bid(None));

        let expected = commitments_digest(state.get_bids(&BIDDER).iter().map(|b| &b.commitment));
        assert_eq!(
            handle_query(&state, AuctionQuery::CommitmentsDigest { bidder: BIDDER }),
            AuctionQueryResponse::Digest(expected)
        );
    }

    #[test]
    fn test_summary_after_reveal() {
        let mut state = populated_state();
        let secret = Secret::from_label("s").unwrap();
        let ctx = CallContext {
            sender: BIDDER,
            timestamp: 100,
            value: 0,
        };
        handle_reveal(
            &mut state,
            &ctx,
            &[ONE_COIN, 2 * ONE_COIN],
            &[false, false],
            &[secret, secret],
        )
        .unwrap();

        let summary = AuctionSummary::from_state(&state, 150);
        assert_eq!(summary.phase, AuctionPhase::Revealing);
        assert_eq!(summary.highest_bid, ONE_COIN);
        assert_eq!(summary.highest_bidder, Some(BIDDER));
        assert_eq!(summary.balance, 2 * ONE_COIN);
        // second bid exceeded its deposit and was refunded
        assert_eq!(summary.total_pending_returns, ONE_COIN);
        assert_eq!(summary.unrevealed_deposits, 0);
        assert_eq!(summary.num_bids, 2);
        assert_eq!(summary.num_bidders, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["highest_bid"], ONE_COIN.to_string());
    }

    #[test]
    fn test_events_pagination() {
        let state = populated_state();
        assert_eq!(get_events(&state, 0, 10).len(), 2);
        assert_eq!(get_events(&state, 1, 10).len(), 1);
        assert!(get_events(&state, 5, 10).is_empty());
    }
}
