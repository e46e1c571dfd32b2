//! Events appended to the auction's log by handlers.

use auction_types::{Address, Amount};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, DisplayFromStr};

/// Observable auction events, in emission order.
///
/// Amounts serialize as decimal strings.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionEvent {
    /// A blinded bid was stored.
    BidCommitted {
        #[serde_as(as = "Hex")]
        bidder: Address,
        index: u32,
        #[serde_as(as = "DisplayFromStr")]
        deposit: Amount,
    },

    /// A stored bid was opened by a matching reveal.
    BidRevealed {
        #[serde_as(as = "Hex")]
        bidder: Address,
        index: u32,
        #[serde_as(as = "DisplayFromStr")]
        value: Amount,
        fake: bool,
    },

    /// A revealed bid took the lead.
    HighestBidIncreased {
        #[serde_as(as = "Hex")]
        bidder: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },

    /// Pending returns were paid out.
    Withdrawal {
        #[serde_as(as = "Hex")]
        bidder: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },

    /// Proceeds were paid to the beneficiary.
    AuctionEnded {
        #[serde_as(as = "Option<Hex>")]
        winner: Option<Address>,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = AuctionEvent::HighestBidIncreased {
            bidder: [0xab; 32],
            amount: 7,
        };
        let json = serde_json::to_value(&event).unwrap();

        let body = &json["highest_bid_increased"];
        assert_eq!(body["bidder"], "ab".repeat(32));
        assert_eq!(body["amount"], "7");
    }

    #[test]
    fn test_auction_ended_without_winner() {
        let event = AuctionEvent::AuctionEnded {
            winner: None,
            amount: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: AuctionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
