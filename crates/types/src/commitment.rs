//! Canonical commitment encoding for blinded bids.
//!
//! A blinded bid is `keccak256(be32(value) || fake || secret)`:
//!
//! | bytes    | field                                  |
//! |----------|----------------------------------------|
//! | `0..32`  | value, 32-byte big-endian unsigned int |
//! | `32`     | fake flag, `0x00` or `0x01`            |
//! | `33..65` | secret, raw 32 bytes                   |
//!
//! Every field is fixed width, so the encoding is injective. It is the same
//! byte string as Solidity's `abi.encodePacked(uint256, bool, bytes32)`.

use crate::{keccak256, sha256, Amount, Commitment, Secret};

/// Length of the packed bid encoding.
pub const ENCODED_BID_LEN: usize = 65;

/// Pack a `(value, fake, secret)` triple into its canonical byte form.
pub fn encode_bid(value: Amount, fake: bool, secret: &Secret) -> [u8; ENCODED_BID_LEN] {
    let mut out = [0u8; ENCODED_BID_LEN];
    // u128 occupies the low 16 bytes of the 32-byte word.
    out[16..32].copy_from_slice(&value.to_be_bytes());
    out[32] = u8::from(fake);
    out[33..].copy_from_slice(&secret.0);
    out
}

/// Compute the blinded bid a bidder submits at commit time.
pub fn blind_bid(value: Amount, fake: bool, secret: &Secret) -> Commitment {
    Commitment(keccak256(&encode_bid(value, fake, secret)))
}

/// Check that a commitment opens to the given triple.
pub fn verify_opening(commitment: &Commitment, value: Amount, fake: bool, secret: &Secret) -> bool {
    blind_bid(value, fake, secret) == *commitment
}

/// Hash an ordered list of commitments.
///
/// Lets a bidder check that the engine holds exactly the commitments they
/// submitted, in the order they submitted them.
pub fn commitments_digest<'a, I>(commitments: I) -> [u8; 32]
where
    I: IntoIterator<Item = &'a Commitment>,
{
    let mut buf = Vec::new();
    for c in commitments {
        buf.extend_from_slice(&c.0);
    }
    sha256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ONE_COIN;

    #[test]
    fn test_encode_layout() {
        let secret = Secret([0xee; 32]);
        let encoded = encode_bid(0x0102, true, &secret);

        assert!(encoded[..30].iter().all(|b| *b == 0));
        assert_eq!(encoded[30], 0x01);
        assert_eq!(encoded[31], 0x02);
        assert_eq!(encoded[32], 0x01);
        assert_eq!(&encoded[33..], &[0xee; 32]);
    }

    #[test]
    fn test_matches_solidity_packed_encoding() {
        // keccak256(abi.encodePacked(uint256(1 ether), false, bytes32("secret1")))
        let secret = Secret::from_label("secret1").unwrap();
        let commitment = blind_bid(ONE_COIN, false, &secret);
        assert_eq!(
            hex::encode(commitment.0),
            "5338ab28b2ebd285d11bba831575a42ce40c2e8f5841dcc954013a92dbadbd1b"
        );

        let fake = blind_bid(ONE_COIN, true, &secret);
        assert_eq!(
            hex::encode(fake.0),
            "c89092f7bbc3b3cc144460d31851f0a03d441e6f44df636ed0639941d01095f7"
        );
    }

    #[test]
    fn test_opening_roundtrip() {
        let secret = Secret::from_label("secret2").unwrap();
        let commitment = blind_bid(2 * ONE_COIN, false, &secret);
        assert!(verify_opening(&commitment, 2 * ONE_COIN, false, &secret));
    }

    #[test]
    fn test_any_field_change_breaks_opening() {
        let secret = Secret::from_label("secret1").unwrap();
        let commitment = blind_bid(ONE_COIN, false, &secret);

        assert!(!verify_opening(&commitment, ONE_COIN + 1, false, &secret));
        assert!(!verify_opening(&commitment, ONE_COIN, true, &secret));

        let mut flipped = secret;
        flipped.0[31] ^= 0x01;
        assert!(!verify_opening(&commitment, ONE_COIN, false, &flipped));
    }

    #[test]
    fn test_commitments_digest_order_sensitive() {
        let c1 = Commitment([1u8; 32]);
        let c2 = Commitment([2u8; 32]);

        let hash1 = commitments_digest(&[c1, c2]);
        let hash2 = commitments_digest(&[c2, c1]);

        assert_eq!(hash1, commitments_digest(&[c1, c2]));
        assert_ne!(hash1, hash2);
    }
}
