//! Typed access to the mock chain's JSON-RPC interface.
//!
//! Addresses, commitments and secrets travel as hex strings; amounts travel as
//! decimal strings so no JSON consumer truncates a `u128`.

use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use auction_module::{
    AuctionCall, AuctionEvent, AuctionQuery, AuctionQueryResponse, AuctionSummary, CallOutcome,
    RevealOutcome,
};
use auction_types::{Address, Amount, Bid, Commitment};

use crate::reveal::RevealBatch;

/// Default mock chain endpoint.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9944";

/// Genesis configuration for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfigRpc {
    /// Hex-encoded beneficiary address
    pub beneficiary: String,
    pub bidding_duration: Option<u64>,
    pub reveal_duration: Option<u64>,
    /// Chain time to start the auction at; defaults to the current chain time
    pub start_time: Option<u64>,
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

/// Client for the mock chain.
#[derive(Debug, Clone)]
pub struct ChainClient {
    inner: HttpClient,
}

impl ChainClient {
    /// Connect to an RPC endpoint.
    pub fn new(url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            inner: HttpClientBuilder::default().build(url)?,
        })
    }

    // ============ Admin Methods ============

    pub async fn init(&self, config: GenesisConfigRpc) -> Result<AuctionSummary, ClientError> {
        self.inner.request("admin_init", vec![config]).await
    }

    pub async fn fund(&self, address: &Address, amount: Amount) -> Result<Amount, ClientError> {
        let balance: AmountRpc = self
            .inner
            .request("admin_fund", vec![hex::encode(address), amount.to_string()])
            .await?;
        Ok(balance.0)
    }

    pub async fn set_timestamp(&self, timestamp: u64) -> Result<BlockInfo, ClientError> {
        self.inner.request("admin_setTimestamp", vec![timestamp]).await
    }

    pub async fn increase_time(&self, seconds: u64) -> Result<BlockInfo, ClientError> {
        self.inner.request("admin_increaseTime", vec![seconds]).await
    }

    pub async fn advance_block(&self) -> Result<BlockInfo, ClientError> {
        self.inner.request("admin_advanceBlock", Vec::<()>::new()).await
    }

    // ============ Auction Methods ============

    /// Submit a blinded bid. Returns its index in the sender's list.
    pub async fn bid(
        &self,
        sender: &Address,
        commitment: &Commitment,
        deposit: Amount,
    ) -> Result<u32, ClientError> {
        let params = BidParams {
            sender: hex::encode(sender),
            commitment: hex::encode(commitment.0),
            deposit: AmountRpc(deposit),
        };
        self.inner.request("auction_bid", vec![params]).await
    }

    pub async fn reveal(
        &self,
        sender: &Address,
        batch: &RevealBatch,
    ) -> Result<RevealOutcome, ClientError> {
        let params = RevealParams {
            sender: hex::encode(sender),
            values: batch.values.iter().copied().map(AmountRpc).collect(),
            fakes: batch.fakes.clone(),
            secrets: batch.secrets.iter().map(|s| hex::encode(s.0)).collect(),
        };
        self.inner.request("auction_reveal", vec![params]).await
    }

    pub async fn withdraw(&self, sender: &Address) -> Result<Amount, ClientError> {
        let amount: AmountRpc = self
            .inner
            .request("auction_withdraw", vec![hex::encode(sender)])
            .await?;
        Ok(amount.0)
    }

    pub async fn end(&self, sender: &Address) -> Result<Amount, ClientError> {
        let amount: AmountRpc = self
            .inner
            .request("auction_end", vec![hex::encode(sender)])
            .await?;
        Ok(amount.0)
    }

    /// Submit a borsh-encoded call message with attached value.
    pub async fn submit_call(
        &self,
        sender: &Address,
        value: Amount,
        call: &AuctionCall,
    ) -> Result<CallOutcome, ClientError> {
        let encoded = borsh::to_vec(call).map_err(|e| ClientError::Custom(e.to_string()))?;
        self.inner
            .request(
                "chain_submitCall",
                vec![hex::encode(sender), value.to_string(), hex::encode(encoded)],
            )
            .await
    }

    // ============ Query Methods ============

    pub async fn block_info(&self) -> Result<BlockInfo, ClientError> {
        self.inner.request("chain_getBlockInfo", Vec::<()>::new()).await
    }

    pub async fn balance(&self, address: &Address) -> Result<Amount, ClientError> {
        let balance: AmountRpc = self
            .inner
            .request("chain_getBalance", vec![hex::encode(address)])
            .await?;
        Ok(balance.0)
    }

    /// Send any auction query; time-dependent queries use the chain's clock.
    pub async fn query(&self, query: AuctionQuery) -> Result<AuctionQueryResponse, ClientError> {
        self.inner.request("query_auction", vec![query]).await
    }

    pub async fn summary(&self) -> Result<AuctionSummary, ClientError> {
        self.inner.request("query_summary", Vec::<()>::new()).await
    }

    pub async fn bids(&self, bidder: &Address) -> Result<Vec<Bid>, ClientError> {
        self.inner.request("query_getBids", vec![hex::encode(bidder)]).await
    }

    pub async fn pending_returns(&self, address: &Address) -> Result<Amount, ClientError> {
        let amount: AmountRpc = self
            .inner
            .request("query_pendingReturns", vec![hex::encode(address)])
            .await?;
        Ok(amount.0)
    }

    pub async fn events(&self, offset: usize, limit: usize) -> Result<Vec<AuctionEvent>, ClientError> {
        self.inner.request("query_events", vec![offset, limit]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_rpc_is_decimal_string() {
        let json = serde_json::to_string(&AmountRpc(u128::MAX)).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));

        let decoded: AmountRpc = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.0, u128::MAX);
    }

    #[test]
    fn test_bid_params_shape() {
        let params = BidParams {
            sender: "ab".repeat(32),
            commitment: "cd".repeat(32),
            deposit: AmountRpc(5),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["deposit"], "5");
    }
}
