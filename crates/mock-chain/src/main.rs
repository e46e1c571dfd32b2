//! Mock chain server for local testing of the blind auction engine.
//!
//! This provides a JSON-RPC server that owns one auction, simulates account
//! balances and wall-clock time, and serializes every call behind a single
//! lock, without requiring a real blockchain.

use anyhow::Result;
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use auction_module::queries::handle_query;
use auction_module::{
    handlers, AuctionCall, AuctionEvent, AuctionGenesisConfig, AuctionQuery,
    AuctionQueryResponse, AuctionState, AuctionSummary, CallContext, CallOutcome, Ledger,
    RevealOutcome,
};
use auction_types::{Address, Amount, Bid};

mod types;
use types::*;

/// Seconds added per simulated block.
const BLOCK_TIME: u64 = 12;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Local JSON-RPC host for a blind auction")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis config (JSON) to start the auction with
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Initial chain timestamp; defaults to the system clock
    #[arg(long)]
    start_time: Option<u64>,
}

/// Shared chain state.
struct ChainState {
    /// Auction, once initialized
    auction: Option<AuctionState>,
    /// Account balances outside the engine
    ledger: Ledger,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, never decreases)
    timestamp: u64,
}

impl ChainState {
    fn new(timestamp: u64) -> Self {
        Self {
            auction: None,
            ledger: Ledger::new(),
            block_height: 0,
            timestamp,
        }
    }

    fn block_info(&self) -> BlockInfo {
        BlockInfo {
            height: self.block_height,
            timestamp: self.timestamp,
        }
    }

    fn advance_block(&mut self) -> Result<(), ErrorObjectOwned> {
        self.increase_time(BLOCK_TIME)
    }

    fn increase_time(&mut self, seconds: u64) -> Result<(), ErrorObjectOwned> {
        self.timestamp = self
            .timestamp
            .checked_add(seconds)
            .ok_or_else(|| rpc_error("Timestamp overflow"))?;
        self.block_height += 1;
        Ok(())
    }

    fn set_timestamp(&mut self, ts: u64) -> Result<(), ErrorObjectOwned> {
        if ts < self.timestamp {
            return Err(rpc_error(format!(
                "Timestamp cannot go backwards: {} < {}",
                ts, self.timestamp
            )));
        }
        self.timestamp = ts;
        self.block_height += 1;
        Ok(())
    }

    fn init(&mut self, config: &AuctionGenesisConfig, start: u64) -> Result<(), ErrorObjectOwned> {
        if self.auction.is_some() {
            return Err(rpc_error("Auction already initialized"));
        }
        let auction = AuctionState::from_genesis(config, start)
            .map_err(|e| rpc_error(format!("Failed to initialize auction: {}", e)))?;
        info!(
            beneficiary = %hex::encode(config.beneficiary),
            bidding_end = auction.bidding_end(),
            reveal_end = auction.reveal_end(),
            "Auction initialized"
        );
        self.auction = Some(auction);
        Ok(())
    }

    fn auction(&self) -> Result<&AuctionState, ErrorObjectOwned> {
        self.auction
            .as_ref()
            .ok_or_else(|| rpc_error("Auction not initialized"))
    }

    /// Answer a read-only query at the current timestamp.
    ///
    /// Queries carrying a time are answered at the chain's clock.
    fn query(&self, query: AuctionQuery) -> Result<AuctionQueryResponse, ErrorObjectOwned> {
        let query = match query {
            AuctionQuery::Phase { .. } => AuctionQuery::Phase {
                now: self.timestamp,
            },
            AuctionQuery::Summary { .. } => AuctionQuery::Summary {
                now: self.timestamp,
            },
            other => other,
        };
        Ok(handle_query(self.auction()?, query))
    }

    /// Apply a call from `sender` with `value` attached.
    ///
    /// The value leaves the sender's account before the engine runs and is
    /// returned if the engine rejects the call.
    fn apply(
        &mut self,
        sender: Address,
        value: Amount,
        call: AuctionCall,
    ) -> Result<CallOutcome, ErrorObjectOwned> {
        let name = call.name();
        if value > 0 && !matches!(call, AuctionCall::Bid { .. }) {
            return Err(rpc_error(format!("Call {} does not accept value", name)));
        }

        let ctx = CallContext {
            sender,
            timestamp: self.timestamp,
            value,
        };
        let auction = self
            .auction
            .as_mut()
            .ok_or_else(|| rpc_error("Auction not initialized"))?;

        self.ledger
            .debit(&sender, value)
            .map_err(|e| rpc_error(format!("Failed to {}: {}", name, e)))?;

        match handlers::dispatch(auction, &ctx, call, &mut self.ledger) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if value > 0 {
                    self.ledger
                        .credit(sender, value)
                        .map_err(|e| rpc_error(format!("Failed to return value: {}", e)))?;
                }
                warn!(
                    call = name,
                    sender = %hex::encode(sender),
                    error = %e,
                    "Call rejected"
                );
                Err(rpc_error(format!("Failed to {}: {}", name, e)))
            }
        }
    }
}

fn unexpected_response(response: AuctionQueryResponse) -> ErrorObjectOwned {
    rpc_error(format!("Unexpected query response: {:?}", response))
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Start the auction.
    #[method(name = "admin_init")]
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<AuctionSummary, ErrorObjectOwned>;

    /// Credit an account.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, address: String, amount: String) -> Result<AmountRpc, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Move the current timestamp forward.
    #[method(name = "admin_increaseTime")]
    async fn admin_increase_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Submit a blinded bid.
    #[method(name = "auction_bid")]
    async fn auction_bid(&self, params: BidParams) -> Result<u32, ErrorObjectOwned>;

    /// Reveal bids.
    #[method(name = "auction_reveal")]
    async fn auction_reveal(&self, params: RevealParams) -> Result<RevealOutcome, ErrorObjectOwned>;

    /// Withdraw pending returns.
    #[method(name = "auction_withdraw")]
    async fn auction_withdraw(&self, sender: String) -> Result<AmountRpc, ErrorObjectOwned>;

    /// End the auction.
    #[method(name = "auction_end")]
    async fn auction_end(&self, sender: String) -> Result<AmountRpc, ErrorObjectOwned>;

    /// Submit a hex-encoded borsh call message.
    #[method(name = "chain_submitCall")]
    async fn chain_submit_call(
        &self,
        sender: String,
        value: String,
        call: String,
    ) -> Result<CallOutcome, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Answer any auction query.
    #[method(name = "query_auction")]
    async fn query_auction(&self, query: AuctionQuery) -> Result<AuctionQueryResponse, ErrorObjectOwned>;

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get an account balance.
    #[method(name = "chain_getBalance")]
    async fn chain_get_balance(&self, address: String) -> Result<AmountRpc, ErrorObjectOwned>;

    /// Get an auction snapshot.
    #[method(name = "query_summary")]
    async fn query_summary(&self) -> Result<AuctionSummary, ErrorObjectOwned>;

    /// Get a bidder's stored bids.
    #[method(name = "query_getBids")]
    async fn query_get_bids(&self, bidder: String) -> Result<Vec<Bid>, ErrorObjectOwned>;

    /// Get an address's pending returns.
    #[method(name = "query_pendingReturns")]
    async fn query_pending_returns(&self, address: String) -> Result<AmountRpc, ErrorObjectOwned>;

    /// Get auction events.
    #[method(name = "query_events")]
    async fn query_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<AuctionEvent>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn submit(&self, sender: &str, value: Amount, call: AuctionCall) -> Result<CallOutcome, ErrorObjectOwned> {
        let sender = decode_address(sender)?;
        self.state.write().apply(sender, value, call)
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<AuctionSummary, ErrorObjectOwned> {
        let genesis = config.to_config()?;
        let mut state = self.state.write();
        let start = config.start_time.unwrap_or(state.timestamp);
        state.init(&genesis, start)?;
        Ok(AuctionSummary::from_state(state.auction()?, state.timestamp))
    }

    async fn admin_fund(&self, address: String, amount: String) -> Result<AmountRpc, ErrorObjectOwned> {
        let address = decode_address(&address)?;
        let amount = decode_amount(&amount)?;
        let mut state = self.state.write();
        state
            .ledger
            .credit(address, amount)
            .map_err(|e| rpc_error(format!("Failed to fund: {}", e)))?;
        info!(address = %hex::encode(address), amount = %amount, "Account funded");
        Ok(AmountRpc(state.ledger.balance_of(&address)))
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.set_timestamp(timestamp)?;
        info!(timestamp, "Timestamp set");
        Ok(state.block_info())
    }

    async fn admin_increase_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.increase_time(seconds)?;
        info!(seconds, timestamp = state.timestamp, "Time increased");
        Ok(state.block_info())
    }

    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block()?;
        Ok(state.block_info())
    }

    async fn auction_bid(&self, params: BidParams) -> Result<u32, ErrorObjectOwned> {
        let commitment = decode_commitment(&params.commitment)?;
        match self.submit(&params.sender, params.deposit.0, AuctionCall::Bid { commitment })? {
            CallOutcome::Committed { index } => Ok(index),
            other => Err(rpc_error(format!("Unexpected outcome: {:?}", other))),
        }
    }

    async fn auction_reveal(&self, params: RevealParams) -> Result<RevealOutcome, ErrorObjectOwned> {
        let call = AuctionCall::Reveal {
            values: params.values(),
            fakes: params.fakes.clone(),
            secrets: params.secrets()?,
        };
        match self.submit(&params.sender, 0, call)? {
            CallOutcome::Revealed(outcome) => {
                info!(
                    sender = %params.sender,
                    accepted = outcome.accepted,
                    skipped = outcome.skipped,
                    "Bids revealed"
                );
                Ok(outcome)
            }
            other => Err(rpc_error(format!("Unexpected outcome: {:?}", other))),
        }
    }

    async fn auction_withdraw(&self, sender: String) -> Result<AmountRpc, ErrorObjectOwned> {
        match self.submit(&sender, 0, AuctionCall::Withdraw)? {
            CallOutcome::Withdrawn { amount } => Ok(AmountRpc(amount)),
            other => Err(rpc_error(format!("Unexpected outcome: {:?}", other))),
        }
    }

    async fn auction_end(&self, sender: String) -> Result<AmountRpc, ErrorObjectOwned> {
        match self.submit(&sender, 0, AuctionCall::AuctionEnd)? {
            CallOutcome::Ended { amount } => Ok(AmountRpc(amount)),
            other => Err(rpc_error(format!("Unexpected outcome: {:?}", other))),
        }
    }

    async fn chain_submit_call(
        &self,
        sender: String,
        value: String,
        call: String,
    ) -> Result<CallOutcome, ErrorObjectOwned> {
        let value = decode_amount(&value)?;
        let bytes = hex::decode(call.trim_start_matches("0x"))
            .map_err(|e| rpc_error(format!("Invalid call hex: {}", e)))?;
        let call: AuctionCall = borsh::from_slice(&bytes)
            .map_err(|e| rpc_error(format!("Invalid call encoding: {}", e)))?;
        self.submit(&sender, value, call)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.read().block_info())
    }

    async fn chain_get_balance(&self, address: String) -> Result<AmountRpc, ErrorObjectOwned> {
        let address = decode_address(&address)?;
        Ok(AmountRpc(self.state.read().ledger.balance_of(&address)))
    }

    async fn query_auction(&self, query: AuctionQuery) -> Result<AuctionQueryResponse, ErrorObjectOwned> {
        self.state.read().query(query)
    }

    async fn query_summary(&self) -> Result<AuctionSummary, ErrorObjectOwned> {
        match self.state.read().query(AuctionQuery::Summary { now: 0 })? {
            AuctionQueryResponse::Summary(summary) => Ok(summary),
            other => Err(unexpected_response(other)),
        }
    }

    async fn query_get_bids(&self, bidder: String) -> Result<Vec<Bid>, ErrorObjectOwned> {
        let bidder = decode_address(&bidder)?;
        match self.state.read().query(AuctionQuery::Bids { bidder })? {
            AuctionQueryResponse::Bids(bids) => Ok(bids),
            other => Err(unexpected_response(other)),
        }
    }

    async fn query_pending_returns(&self, address: String) -> Result<AmountRpc, ErrorObjectOwned> {
        let address = decode_address(&address)?;
        match self.state.read().query(AuctionQuery::PendingReturns { address })? {
            AuctionQueryResponse::Amount(amount) => Ok(AmountRpc(amount)),
            other => Err(unexpected_response(other)),
        }
    }

    async fn query_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<AuctionEvent>, ErrorObjectOwned> {
        match self.state.read().query(AuctionQuery::Events { offset, limit })? {
            AuctionQueryResponse::Events(events) => Ok(events),
            other => Err(unexpected_response(other)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let start_time = match args.start_time {
        Some(ts) => ts,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    let mut chain = ChainState::new(start_time);

    if let Some(path) = &args.genesis {
        let data = std::fs::read_to_string(path)?;
        let config = AuctionGenesisConfig::from_json(&data)?;
        chain
            .init(&config, start_time)
            .map_err(|e| anyhow::anyhow!(e.message().to_string()))?;
    }

    info!("Starting mock chain server on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(MockChainServer::new(chain).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{blind_bid, AuctionPhase, Secret, ONE_COIN};

    const BENEFICIARY: Address = [0xbe; 32];
    const ALICE: Address = [0xa1; 32];

    fn chain() -> ChainState {
        let mut chain = ChainState::new(1_000);
        let mut config = AuctionGenesisConfig::new(BENEFICIARY);
        config.timing.bidding_duration = 100;
        config.timing.reveal_duration = 100;
        chain.init(&config, 1_000).unwrap();
        chain.ledger.credit(ALICE, 10 * ONE_COIN).unwrap();
        chain
    }

    #[test]
    fn test_timestamp_is_monotonic() {
        let mut chain = chain();
        chain.set_timestamp(1_050).unwrap();
        assert!(chain.set_timestamp(1_049).is_err());
        assert_eq!(chain.timestamp, 1_050);

        chain.advance_block().unwrap();
        assert_eq!(chain.timestamp, 1_050 + BLOCK_TIME);
        assert!(chain.increase_time(u64::MAX).is_err());
    }

    #[test]
    fn test_bid_debits_sender() {
        let mut chain = chain();
        let commitment = blind_bid(ONE_COIN, false, &Secret::from_label("a").unwrap());

        let outcome = chain.apply(ALICE, 3 * ONE_COIN, AuctionCall::Bid { commitment });

        assert_eq!(outcome.unwrap(), CallOutcome::Committed { index: 0 });
        assert_eq!(chain.ledger.balance_of(&ALICE), 7 * ONE_COIN);
        assert_eq!(chain.auction().unwrap().balance(), 3 * ONE_COIN);
    }

    #[test]
    fn test_rejected_bid_returns_value() {
        let mut chain = chain();
        chain.set_timestamp(1_100).unwrap();
        let commitment = blind_bid(ONE_COIN, false, &Secret::from_label("a").unwrap());

        let result = chain.apply(ALICE, ONE_COIN, AuctionCall::Bid { commitment });

        assert!(result.is_err());
        assert_eq!(chain.ledger.balance_of(&ALICE), 10 * ONE_COIN);
        assert_eq!(chain.auction().unwrap().balance(), 0);
    }

    #[test]
    fn test_insufficient_funds() {
        let mut chain = chain();
        let result = chain.apply(ALICE, 11 * ONE_COIN, AuctionCall::Bid {
            commitment: Default::default(),
        });
        assert!(result.is_err());
        assert!(chain.auction().unwrap().get_bids(&ALICE).is_empty());
    }

    #[test]
    fn test_value_only_on_bid() {
        let mut chain = chain();
        let result = chain.apply(ALICE, 1, AuctionCall::Withdraw);
        assert!(result.is_err());
        assert_eq!(chain.ledger.balance_of(&ALICE), 10 * ONE_COIN);
    }

    #[test]
    fn test_full_lifecycle_through_ledger() {
        let mut chain = chain();
        let secret = Secret::from_label("a").unwrap();
        let commitment = blind_bid(2 * ONE_COIN, false, &secret);
        chain
            .apply(ALICE, 3 * ONE_COIN, AuctionCall::Bid { commitment })
            .unwrap();

        chain.set_timestamp(1_100).unwrap();
        chain
            .apply(
                ALICE,
                0,
                AuctionCall::Reveal {
                    values: vec![2 * ONE_COIN],
                    fakes: vec![false],
                    secrets: vec![secret],
                },
            )
            .unwrap();
        chain.apply(ALICE, 0, AuctionCall::Withdraw).unwrap();

        chain.set_timestamp(1_200).unwrap();
        let outcome = chain.apply(ALICE, 0, AuctionCall::AuctionEnd).unwrap();

        assert_eq!(outcome, CallOutcome::Ended { amount: 2 * ONE_COIN });
        assert_eq!(chain.ledger.balance_of(&BENEFICIARY), 2 * ONE_COIN);
        assert_eq!(chain.ledger.balance_of(&ALICE), 8 * ONE_COIN);
        assert!(chain.auction().unwrap().is_balanced());
    }

    #[test]
    fn test_queries_use_chain_clock() {
        let mut chain = chain();
        let commitment = blind_bid(ONE_COIN, true, &Secret::from_label("a").unwrap());
        chain
            .apply(ALICE, ONE_COIN, AuctionCall::Bid { commitment })
            .unwrap();
        chain.set_timestamp(1_100).unwrap();

        let phase = chain.query(AuctionQuery::Phase { now: 0 }).unwrap();
        assert_eq!(phase, AuctionQueryResponse::Phase(AuctionPhase::Revealing));

        match chain.query(AuctionQuery::Summary { now: 0 }).unwrap() {
            AuctionQueryResponse::Summary(summary) => {
                assert_eq!(summary.phase, AuctionPhase::Revealing);
                assert_eq!(summary.num_bids, 1);
                assert_eq!(summary.unrevealed_deposits, ONE_COIN);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let bids = chain.query(AuctionQuery::Bids { bidder: ALICE }).unwrap();
        assert!(matches!(bids, AuctionQueryResponse::Bids(ref b) if b.len() == 1));

        let pending = chain
            .query(AuctionQuery::PendingReturns { address: ALICE })
            .unwrap();
        assert_eq!(pending, AuctionQueryResponse::Amount(0));
    }

    #[test]
    fn test_query_before_init() {
        let chain = ChainState::new(1_000);
        let result = chain.query(AuctionQuery::HighestBid);
        assert_eq!(result.unwrap_err().code(), RPC_ERROR_CODE);
    }

    #[test]
    fn test_double_init() {
        let mut chain = chain();
        let config = AuctionGenesisConfig::new(BENEFICIARY);
        assert!(chain.init(&config, 2_000).is_err());
    }
}
