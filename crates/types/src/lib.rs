//! Core type definitions for blind (commit-reveal) auctions.
//!
//! This crate provides the shared data structures used across the auction system:
//! identities, amounts, blinded bid commitments and the canonical commitment
//! encoding that bidders and the engine must agree on bit-for-bit.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, DisplayFromStr};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod commitment;

pub use commitment::{blind_bid, commitments_digest, encode_bid, verify_opening};

// =========================
// PRIMITIVES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Currency amount in the smallest unit.
pub type Amount = u128;

/// One whole coin (10^18 base units), for fixtures and display.
pub const ONE_COIN: Amount = 1_000_000_000_000_000_000;

/// Errors raised while parsing or constructing primitive values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypesError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Label too long for a 32-byte secret: {0} bytes (max 31)")]
    LabelTooLong(usize),
}

/// Decode a 32-byte value from hex, with or without a `0x` prefix.
pub fn decode_bytes32(s: &str) -> Result<[u8; 32], TypesError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| TypesError::InvalidLength { expected: 32, got })
}

/// Parse a hex address.
pub fn parse_address(s: &str) -> Result<Address, TypesError> {
    decode_bytes32(s)
}

/// Blinded bid: keccak256 of the packed `(value, fake, secret)` triple.
#[serde_as]
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Commitment(#[serde_as(as = "Hex")] pub [u8; 32]);

/// Secret nonce mixed into a commitment. Never published before reveal.
#[serde_as]
#[derive(
    Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Secret(#[serde_as(as = "Hex")] pub [u8; 32]);

impl Secret {
    /// Build a secret from a short text label, right-padded with zeros.
    ///
    /// Matches the `bytes32` string encoding used by EVM tooling, which
    /// reserves the last byte as a terminator.
    pub fn from_label(label: &str) -> Result<Self, TypesError> {
        let bytes = label.as_bytes();
        if bytes.len() > 31 {
            return Err(TypesError::LabelTooLong(bytes.len()));
        }
        let mut out = [0u8; 32];
        out[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Commitment {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_bytes32(s).map(Self)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl FromStr for Secret {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_bytes32(s).map(Self)
    }
}

// =========================
// AUCTION TYPES
// =========================

/// A committed bid (stored by the engine).
///
/// The commitment is kept after reveal for audit; `revealed` marks the slot
/// as consumed by a matching reveal.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub commitment: Commitment,
    #[serde_as(as = "DisplayFromStr")]
    pub deposit: Amount,
    pub revealed: bool,
}

impl Bid {
    pub fn new(commitment: Commitment, deposit: Amount) -> Self {
        Self {
            commitment,
            deposit,
            revealed: false,
        }
    }
}

/// Auction lifecycle phase, derived from the current time and the `ended` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionPhase {
    /// Before bidding_end: commitments accepted
    Bidding,
    /// Between bidding_end and reveal_end: reveals accepted
    Revealing,
    /// After reveal_end, before auction end was called
    AwaitingSettlement,
    /// Proceeds paid out
    Ended,
}

impl AuctionPhase {
    /// Compute the phase at `now`.
    pub fn at(now: u64, bidding_end: u64, reveal_end: u64, ended: bool) -> Self {
        if ended {
            Self::Ended
        } else if now < bidding_end {
            Self::Bidding
        } else if now < reveal_end {
            Self::Revealing
        } else {
            Self::AwaitingSettlement
        }
    }
}

impl fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bidding => "bidding",
            Self::Revealing => "revealing",
            Self::AwaitingSettlement => "awaiting_settlement",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute Keccak-256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    Keccak256::digest(data).into()
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_secret_from_label() {
        let secret = Secret::from_label("secret1").unwrap();
        assert_eq!(&secret.0[..7], b"secret1");
        assert!(secret.0[7..].iter().all(|b| *b == 0));

        let long = "x".repeat(32);
        assert_eq!(
            Secret::from_label(&long),
            Err(TypesError::LabelTooLong(32))
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::from_label("hunter2").unwrap();
        assert_eq!(format!("{:?}", secret), "Secret(..)");
    }

    #[test]
    fn test_parse_address() {
        let hex_addr = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_address(&hex_addr).unwrap(), [0xab; 32]);

        assert!(matches!(
            parse_address("0xabcd"),
            Err(TypesError::InvalidLength { expected: 32, got: 2 })
        ));
        assert_eq!(
            parse_address("zz"),
            Err(TypesError::InvalidHex(hex::FromHexError::InvalidHexCharacter {
                c: 'z',
                index: 0
            }))
        );
    }

    #[test]
    fn test_commitment_json_is_hex() {
        let commitment = Commitment([7u8; 32]);
        let json = serde_json::to_string(&commitment).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));

        let decoded: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, commitment);
    }

    #[test]
    fn test_bid_borsh_serialization() {
        let bid = Bid::new(Commitment([42u8; 32]), 5 * ONE_COIN);
        let encoded = borsh::to_vec(&bid).unwrap();
        let decoded: Bid = borsh::from_slice(&encoded).unwrap();
        assert_eq!(bid, decoded);
        assert!(!decoded.revealed);
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(AuctionPhase::at(99, 100, 200, false), AuctionPhase::Bidding);
        assert_eq!(AuctionPhase::at(100, 100, 200, false), AuctionPhase::Revealing);
        assert_eq!(AuctionPhase::at(199, 100, 200, false), AuctionPhase::Revealing);
        assert_eq!(
            AuctionPhase::at(200, 100, 200, false),
            AuctionPhase::AwaitingSettlement
        );
        assert_eq!(AuctionPhase::at(50, 100, 200, true), AuctionPhase::Ended);
    }
}
