//! Bid creation and blinding.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

use auction_types::{blind_bid, verify_opening, Amount, Commitment, Secret};

/// Errors that can occur during bid creation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidError {
    #[error("Deposit {deposit} does not cover bid value {value}")]
    Underfunded { value: Amount, deposit: Amount },

    #[error("Deposit must be non-zero")]
    ZeroDeposit,
}

/// A prepared bid ready for submission.
///
/// Everything except `commitment` and `deposit` must stay private until the
/// reveal window opens.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedBid {
    /// Blinded bid submitted on-chain
    pub commitment: Commitment,
    /// Funds attached to the submission
    #[serde_as(as = "DisplayFromStr")]
    pub deposit: Amount,
    /// Bid value (keep secret)
    #[serde_as(as = "DisplayFromStr")]
    pub value: Amount,
    /// Decoy flag (keep secret)
    pub fake: bool,
    /// Blinding secret (keep secret)
    pub secret: Secret,
}

impl PreparedBid {
    /// Check that this bid opens `commitment`.
    pub fn opens(&self, commitment: &Commitment) -> bool {
        verify_opening(commitment, self.value, self.fake, &self.secret)
    }
}

/// Draw a fresh blinding secret.
pub fn random_secret<R: RngCore + CryptoRng>(rng: &mut R) -> Secret {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    Secret(bytes)
}

/// Create a blinded bid with a random secret.
///
/// A real bid whose deposit is below its value can never lead, so it is
/// rejected here. Decoys may carry any deposit.
pub fn prepare_bid<R: RngCore + CryptoRng>(
    value: Amount,
    fake: bool,
    deposit: Amount,
    rng: &mut R,
) -> Result<PreparedBid, BidError> {
    BidBuilder::new(value).fake(fake).deposit(deposit).build(rng)
}

/// Builder for creating bids with additional options.
#[derive(Debug, Clone)]
pub struct BidBuilder {
    value: Amount,
    fake: bool,
    deposit: Option<Amount>,
    secret: Option<Secret>,
}

impl BidBuilder {
    /// Create a new bid builder. The deposit defaults to the value.
    pub fn new(value: Amount) -> Self {
        Self {
            value,
            fake: false,
            deposit: None,
            secret: None,
        }
    }

    /// Mark the bid as a decoy.
    pub fn fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    /// Set the deposit.
    pub fn deposit(mut self, deposit: Amount) -> Self {
        self.deposit = Some(deposit);
        self
    }

    /// Use a fixed secret instead of a random one.
    pub fn secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Build the prepared bid.
    pub fn build<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<PreparedBid, BidError> {
        let deposit = self.deposit.unwrap_or(self.value);
        if deposit == 0 {
            return Err(BidError::ZeroDeposit);
        }
        if !self.fake && deposit < self.value {
            return Err(BidError::Underfunded {
                value: self.value,
                deposit,
            });
        }

        let secret = self.secret.unwrap_or_else(|| random_secret(rng));
        Ok(PreparedBid {
            commitment: blind_bid(self.value, self.fake, &secret),
            deposit,
            value: self.value,
            fake: self.fake,
            secret,
        })
    }
}
