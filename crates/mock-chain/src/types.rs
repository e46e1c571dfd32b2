//! RPC-compatible types for the mock chain.
//!
//! Addresses, commitments and secrets are hex strings; amounts are decimal
//! strings.

use auction_module::AuctionGenesisConfig;
use auction_types::{decode_bytes32, parse_address, Address, Amount, Commitment, Secret};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Application error code for every rejected call.
pub const RPC_ERROR_CODE: i32 = -32000;

pub fn rpc_error(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(RPC_ERROR_CODE, msg.into(), None::<()>)
}

/// Genesis configuration for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfigRpc {
    pub beneficiary: String,
    pub bidding_duration: Option<u64>,
    pub reveal_duration: Option<u64>,
    pub start_time: Option<u64>,
}

impl GenesisConfigRpc {
    /// Convert into a validated genesis config.
    pub fn to_config(&self) -> Result<AuctionGenesisConfig, ErrorObjectOwned> {
        let mut config = AuctionGenesisConfig::new(decode_address(&self.beneficiary)?);
        if let Some(d) = self.bidding_duration {
            config.timing.bidding_duration = d;
        }
        if let Some(d) = self.reveal_duration {
            config.timing.reveal_duration = d;
        }
        config
            .validate()
            .map_err(|e| rpc_error(format!("Invalid genesis: {}", e)))?;
        Ok(config)
    }
}

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Amount encoded as a decimal string.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmountRpc(#[serde_as(as = "DisplayFromStr")] pub Amount);

/// Parameters for submitting a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidParams {
    pub sender: String,
    /// Hex-encoded commitment (32 bytes)
    pub commitment: String,
    pub deposit: AmountRpc,
}

/// Parameters for revealing bids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealParams {
    pub sender: String,
    pub values: Vec<AmountRpc>,
    pub fakes: Vec<bool>,
    /// Hex-encoded secrets (32 bytes each)
    pub secrets: Vec<String>,
}

impl RevealParams {
    pub fn values(&self) -> Vec<Amount> {
        self.values.iter().map(|v| v.0).collect()
    }

    pub fn secrets(&self) -> Result<Vec<Secret>, ErrorObjectOwned> {
        self.secrets
            .iter()
            .map(|s| {
                decode_bytes32(s)
                    .map(Secret)
                    .map_err(|e| rpc_error(format!("Invalid secret: {}", e)))
            })
            .collect()
    }
}

pub fn decode_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    parse_address(s).map_err(|e| rpc_error(format!("Invalid address: {}", e)))
}

pub fn decode_commitment(s: &str) -> Result<Commitment, ErrorObjectOwned> {
    s.parse()
        .map_err(|e| rpc_error(format!("Invalid commitment: {}", e)))
}

pub fn decode_amount(s: &str) -> Result<Amount, ErrorObjectOwned> {
    s.parse()
        .map_err(|e| rpc_error(format!("Invalid amount: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_config_rpc() {
        let rpc = GenesisConfigRpc {
            beneficiary: format!("0x{}", "11".repeat(32)),
            bidding_duration: Some(60),
            reveal_duration: None,
            start_time: None,
        };
        let config = rpc.to_config().unwrap();
        assert_eq!(config.beneficiary, [0x11; 32]);
        assert_eq!(config.timing.bidding_duration, 60);
        assert_eq!(config.timing.reveal_duration, 2 * 24 * 60 * 60);

        let zero = GenesisConfigRpc {
            beneficiary: "00".repeat(32),
            ..rpc
        };
        assert_eq!(zero.to_config().unwrap_err().code(), RPC_ERROR_CODE);
    }

    #[test]
    fn test_reveal_params_decoding() {
        let params: RevealParams = serde_json::from_value(serde_json::json!({
            "sender": "22".repeat(32),
            "values": ["1000000000000000000"],
            "fakes": [false],
            "secrets": ["33".repeat(32)]
        }))
        .unwrap();

        assert_eq!(params.values(), vec![1_000_000_000_000_000_000]);
        assert_eq!(params.secrets().unwrap(), vec![Secret([0x33; 32])]);

        let bad = RevealParams {
            secrets: vec!["abcd".into()],
            ..params
        };
        assert!(bad.secrets().is_err());
    }

    #[test]
    fn test_decode_amount() {
        assert_eq!(decode_amount("340282366920938463463374607431768211455").unwrap(), u128::MAX);
        assert!(decode_amount("-1").is_err());
    }
}
