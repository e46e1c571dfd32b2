//! Genesis configuration for the auction module.
//!
//! This module defines the parameters an auction is constructed with. Deadlines
//! are derived from these durations and the construction timestamp.

use auction_types::Address;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

/// One day in seconds.
pub const DAY: u64 = 24 * 60 * 60;

/// Genesis configuration for the auction module.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Recipient of the winning bid
    #[serde_as(as = "Hex")]
    pub beneficiary: Address,

    /// Window lengths
    #[serde(default)]
    pub timing: AuctionTiming,
}

/// Bidding and reveal window lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionTiming {
    /// Length of the bidding window (seconds)
    pub bidding_duration: u64,
    /// Length of the reveal window (seconds)
    pub reveal_duration: u64,
}

impl Default for AuctionTiming {
    fn default() -> Self {
        Self {
            bidding_duration: 3 * DAY,
            reveal_duration: 2 * DAY,
        }
    }
}

impl AuctionGenesisConfig {
    /// Create a config with default timing.
    pub fn new(beneficiary: Address) -> Self {
        Self {
            beneficiary,
            timing: AuctionTiming::default(),
        }
    }

    /// Load a config from a JSON string.
    pub fn from_json(data: &str) -> Result<Self, GenesisValidationError> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| GenesisValidationError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.beneficiary == [0u8; 32] {
            return Err(GenesisValidationError::ZeroBeneficiary);
        }
        if self.timing.bidding_duration == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Bidding duration cannot be zero".into(),
            ));
        }
        if self.timing.reveal_duration == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Reveal duration cannot be zero".into(),
            ));
        }
        if self
            .timing
            .bidding_duration
            .checked_add(self.timing.reveal_duration)
            .is_none()
        {
            return Err(GenesisValidationError::InvalidTiming(
                "Total duration overflows".into(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid timing configuration: {0}")]
    InvalidTiming(String),

    #[error("Beneficiary cannot be the zero address")]
    ZeroBeneficiary,

    #[error("Malformed genesis config: {0}")]
    Malformed(String),
}
