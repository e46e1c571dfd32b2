//! Engine state for a single blind auction.

use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::genesis::AuctionGenesisConfig;
use auction_types::{Address, Amount, AuctionPhase, Bid};
use std::collections::HashMap;

/// Auction module state.
///
/// Created once at construction and owned by the host for the auction's whole
/// life. Fields are only mutated through the handlers.
#[derive(Debug, Clone)]
pub struct AuctionState {
    /// Recipient of the winning bid
    pub(crate) beneficiary: Address,

    /// Commitments accepted while `timestamp < bidding_end`
    pub(crate) bidding_end: u64,

    /// Reveals accepted while `bidding_end <= timestamp < reveal_end`
    pub(crate) reveal_end: u64,

    /// Blinded bids per bidder, in submission order
    pub(crate) bids: HashMap<Address, Vec<Bid>>,

    /// Reclaimable balances
    pub(crate) pending_returns: HashMap<Address, Amount>,

    /// Current leading amount
    pub(crate) highest_bid: Amount,

    /// Current leader
    pub(crate) highest_bidder: Option<Address>,

    /// Set once by auction end
    pub(crate) ended: bool,

    /// Funds held by the engine
    pub(crate) balance: Amount,

    /// Emitted events
    pub(crate) events: Vec<AuctionEvent>,
}

impl AuctionState {
    /// Create a new auction starting at `start`.
    pub fn new(
        beneficiary: Address,
        start: u64,
        bidding_duration: u64,
        reveal_duration: u64,
    ) -> Result<Self, AuctionError> {
        if bidding_duration == 0 || reveal_duration == 0 {
            return Err(AuctionError::InvalidTiming);
        }
        let bidding_end = start
            .checked_add(bidding_duration)
            .ok_or(AuctionError::InvalidTiming)?;
        let reveal_end = bidding_end
            .checked_add(reveal_duration)
            .ok_or(AuctionError::InvalidTiming)?;

        Ok(Self {
            beneficiary,
            bidding_end,
            reveal_end,
            bids: HashMap::new(),
            pending_returns: HashMap::new(),
            highest_bid: 0,
            highest_bidder: None,
            ended: false,
            balance: 0,
            events: Vec::new(),
        })
    }

    /// Create an auction from a genesis config.
    pub fn from_genesis(config: &AuctionGenesisConfig, start: u64) -> Result<Self, AuctionError> {
        Self::new(
            config.beneficiary,
            start,
            config.timing.bidding_duration,
            config.timing.reveal_duration,
        )
    }

    pub fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    pub fn bidding_end(&self) -> u64 {
        self.bidding_end
    }

    pub fn reveal_end(&self) -> u64 {
        self.reveal_end
    }

    pub fn highest_bid(&self) -> Amount {
        self.highest_bid
    }

    pub fn highest_bidder(&self) -> Option<&Address> {
        self.highest_bidder.as_ref()
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Funds currently held by the engine.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    /// Phase at `now`.
    pub fn phase(&self, now: u64) -> AuctionPhase {
        AuctionPhase::at(now, self.bidding_end, self.reveal_end, self.ended)
    }

    /// Get a bidder's bids in submission order.
    pub fn get_bids(&self, bidder: &Address) -> &[Bid] {
        self.bids.get(bidder).map(Vec::as_slice).unwrap_or_default()
    }

    /// Get a single bid by position.
    pub fn get_bid(&self, bidder: &Address, index: usize) -> Option<&Bid> {
        self.bids.get(bidder).and_then(|bids| bids.get(index))
    }

    /// Number of distinct bidders.
    pub fn bidder_count(&self) -> usize {
        self.bids.len()
    }

    /// Get an address's reclaimable balance.
    pub fn get_pending_returns(&self, address: &Address) -> Amount {
        self.pending_returns.get(address).copied().unwrap_or(0)
    }

    /// Add to an address's reclaimable balance.
    ///
    /// Every credit is bounded by `balance`, which is overflow-checked on
    /// deposit, so this addition cannot overflow.
    pub(crate) fn add_pending_return(&mut self, address: Address, amount: Amount) {
        *self.pending_returns.entry(address).or_insert(0) += amount;
    }

    /// Remove and return an address's reclaimable balance.
    pub(crate) fn take_pending_return(&mut self, address: &Address) -> Amount {
        self.pending_returns.remove(address).unwrap_or(0)
    }

    /// Sum of all reclaimable balances.
    pub fn total_pending_returns(&self) -> Amount {
        self.pending_returns.values().sum()
    }

    /// Deposits of bids no matching reveal has consumed yet.
    ///
    /// After the reveal window closes this is the forfeited amount.
    pub fn unrevealed_deposits(&self) -> Amount {
        self.bids
            .values()
            .flatten()
            .filter(|bid| !bid.revealed)
            .map(|bid| bid.deposit)
            .sum()
    }

    /// Check that every unit held is accounted for.
    pub fn is_balanced(&self) -> bool {
        let locked = if self.ended { 0 } else { self.highest_bid };
        self.balance == locked + self.total_pending_returns() + self.unrevealed_deposits()
    }

    pub(crate) fn emit(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::DAY;
    use auction_types::Commitment;

    #[test]
    fn test_deadlines() {
        let state = AuctionState::new([1u8; 32], 1_000, 3 * DAY, 2 * DAY).unwrap();
        assert_eq!(state.bidding_end(), 1_000 + 3 * DAY);
        assert_eq!(state.reveal_end(), 1_000 + 5 * DAY);
        assert!(state.bidding_end() < state.reveal_end());
        assert_eq!(state.highest_bid(), 0);
        assert!(state.highest_bidder().is_none());
        assert!(!state.ended());
    }

    #[test]
    fn test_invalid_timing() {
        assert_eq!(
            AuctionState::new([1u8; 32], 0, 0, 10).unwrap_err(),
            AuctionError::InvalidTiming
        );
        assert_eq!(
            AuctionState::new([1u8; 32], 0, 10, 0).unwrap_err(),
            AuctionError::InvalidTiming
        );
        assert_eq!(
            AuctionState::new([1u8; 32], u64::MAX - 5, 10, 10).unwrap_err(),
            AuctionError::InvalidTiming
        );
    }

    #[test]
    fn test_from_genesis() {
        let config = AuctionGenesisConfig::new([9u8; 32]);
        let state = AuctionState::from_genesis(&config, 50).unwrap();
        assert_eq!(state.beneficiary(), &[9u8; 32]);
        assert_eq!(state.bidding_end(), 50 + 3 * DAY);
    }

    #[test]
    fn test_pending_return_operations() {
        let mut state = AuctionState::new([1u8; 32], 0, 10, 10).unwrap();
        let addr = [2u8; 32];

        assert_eq!(state.get_pending_returns(&addr), 0);

        state.add_pending_return(addr, 100);
        state.add_pending_return(addr, 50);
        assert_eq!(state.get_pending_returns(&addr), 150);
        assert_eq!(state.total_pending_returns(), 150);

        assert_eq!(state.take_pending_return(&addr), 150);
        assert_eq!(state.get_pending_returns(&addr), 0);
        assert_eq!(state.take_pending_return(&addr), 0);
    }

    #[test]
    fn test_unrevealed_deposits() {
        let mut state = AuctionState::new([1u8; 32], 0, 10, 10).unwrap();
        let bidder = [2u8; 32];
        let mut revealed = Bid::new(Commitment([1u8; 32]), 30);
        revealed.revealed = true;
        state.bids.insert(
            bidder,
            vec![Bid::new(Commitment([0u8; 32]), 70), revealed],
        );

        assert_eq!(state.unrevealed_deposits(), 70);
        assert_eq!(state.get_bids(&bidder).len(), 2);
        assert_eq!(state.get_bid(&bidder, 1).map(|b| b.deposit), Some(30));
        assert!(state.get_bid(&bidder, 2).is_none());
        assert!(state.get_bids(&[3u8; 32]).is_empty());
    }

    #[test]
    fn test_phase() {
        let state = AuctionState::new([1u8; 32], 0, 10, 10).unwrap();
        assert_eq!(state.phase(0), AuctionPhase::Bidding);
        assert_eq!(state.phase(10), AuctionPhase::Revealing);
        assert_eq!(state.phase(20), AuctionPhase::AwaitingSettlement);
    }
}
