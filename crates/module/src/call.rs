//! Call message types for the auction module.

use auction_types::{Amount, Commitment, Secret};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages for the auction module.
///
/// The deposit for `Bid` is the value attached to the call, not a field.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    /// Submit a blinded bid.
    Bid { commitment: Commitment },

    /// Open previously submitted bids, in submission order.
    Reveal {
        values: Vec<Amount>,
        fakes: Vec<bool>,
        secrets: Vec<Secret>,
    },

    /// Withdraw pending returns.
    Withdraw,

    /// Pay the highest bid to the beneficiary.
    AuctionEnd,
}

impl AuctionCall {
    /// Name used in logs and RPC errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bid { .. } => "bid",
            Self::Reveal { .. } => "reveal",
            Self::Withdraw => "withdraw",
            Self::AuctionEnd => "auction_end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_borsh_encoding() {
        let call = AuctionCall::Reveal {
            values: vec![1, 2],
            fakes: vec![false, true],
            secrets: vec![Secret([3u8; 32]), Secret([4u8; 32])],
        };
        let encoded = borsh::to_vec(&call).unwrap();
        // variant tag, then three length-prefixed vectors
        assert_eq!(encoded[0], 1);
        assert_eq!(encoded.len(), 1 + (4 + 2 * 16) + (4 + 2) + (4 + 2 * 32));

        let decoded: AuctionCall = borsh::from_slice(&encoded).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(decoded.name(), "reveal");
    }

    #[test]
    fn test_unit_calls_are_one_byte() {
        assert_eq!(borsh::to_vec(&AuctionCall::Withdraw).unwrap(), vec![2]);
        assert_eq!(borsh::to_vec(&AuctionCall::AuctionEnd).unwrap(), vec![3]);
    }
}
