//! Reveal batches.

use auction_module::AuctionCall;
use auction_types::{Amount, Bid, Secret};

use crate::bid::PreparedBid;

/// Ordered reveal arguments for one bidder.
///
/// Position `i` opens the bidder's `i`-th stored bid, so the batch must be
/// built from prepared bids in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealBatch {
    pub values: Vec<Amount>,
    pub fakes: Vec<bool>,
    pub secrets: Vec<Secret>,
}

impl RevealBatch {
    /// Build a batch from prepared bids in submission order.
    pub fn from_prepared<'a, I>(bids: I) -> Self
    where
        I: IntoIterator<Item = &'a PreparedBid>,
    {
        let mut batch = Self::default();
        for bid in bids {
            batch.push(bid);
        }
        batch
    }

    /// Append the opening of the next bid.
    pub fn push(&mut self, bid: &PreparedBid) {
        self.values.push(bid.value);
        self.fakes.push(bid.fake);
        self.secrets.push(bid.secret);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positions whose opening does not match the stored commitment.
    ///
    /// The engine silently skips such slots, so bidders should check before
    /// submitting. Positions present in only some of the three lists are
    /// reported too.
    pub fn mismatches(&self, stored: &[Bid]) -> Vec<usize> {
        let longest = self
            .values
            .len()
            .max(self.fakes.len())
            .max(self.secrets.len());

        (0..longest)
            .filter(|&i| {
                let opening = (self.values.get(i), self.fakes.get(i), self.secrets.get(i));
                match (stored.get(i), opening) {
                    (Some(bid), (Some(&value), Some(&fake), Some(secret))) => {
                        !auction_types::verify_opening(&bid.commitment, value, fake, secret)
                    }
                    _ => true,
                }
            })
            .collect()
    }

    /// Convert into a call message.
    pub fn into_call(self) -> AuctionCall {
        AuctionCall::Reveal {
            values: self.values,
            fakes: self.fakes,
            secrets: self.secrets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidBuilder;
    use auction_types::ONE_COIN;
    use rand::rngs::OsRng;

    fn prepared(n: usize) -> Vec<PreparedBid> {
        let mut rng = OsRng;
        (0..n)
            .map(|i| {
                BidBuilder::new((i as Amount + 1) * ONE_COIN)
                    .fake(i % 2 == 1)
                    .build(&mut rng)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_batch_preserves_order() {
        let bids = prepared(3);
        let batch = RevealBatch::from_prepared(&bids);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.values, vec![ONE_COIN, 2 * ONE_COIN, 3 * ONE_COIN]);
        assert_eq!(batch.fakes, vec![false, true, false]);
        assert_eq!(batch.secrets[2], bids[2].secret);
    }

    #[test]
    fn test_mismatches() {
        let bids = prepared(2);
        let stored: Vec<Bid> = bids
            .iter()
            .map(|b| Bid::new(b.commitment, b.deposit))
            .collect();

        let batch = RevealBatch::from_prepared(&bids);
        assert!(batch.mismatches(&stored).is_empty());

        // Swapped order opens nothing.
        let swapped = RevealBatch::from_prepared(bids.iter().rev());
        assert_eq!(swapped.mismatches(&stored), vec![0, 1]);

        // Extra entries with no stored bid are reported too.
        let longer = RevealBatch::from_prepared(bids.iter().chain(bids.iter().take(1)));
        assert_eq!(longer.mismatches(&stored), vec![2]);
    }

    #[test]
    fn test_mismatches_uneven_batch() {
        let bids = prepared(2);
        let stored: Vec<Bid> = bids
            .iter()
            .map(|b| Bid::new(b.commitment, b.deposit))
            .collect();

        let mut batch = RevealBatch::from_prepared(&bids);
        batch.fakes.pop();
        assert_eq!(batch.mismatches(&stored), vec![1]);

        batch.values.clear();
        assert_eq!(batch.mismatches(&stored), vec![0, 1]);
    }

    #[test]
    fn test_into_call() {
        let bids = prepared(1);
        let call = RevealBatch::from_prepared(&bids).into_call();
        assert!(matches!(call, AuctionCall::Reveal { ref values, .. } if values.len() == 1));
    }
}
