//! CLI for interacting with blind auctions on the mock chain.
//!
//! This binary provides commands for:
//! - Initializing and funding the local chain
//! - Submitting blinded bids and revealing them later from the local vault
//! - Withdrawing pending returns and ending the auction
//! - Querying auction status and moving chain time

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use tracing::{info, warn};

use auction_client::rpc::{GenesisConfigRpc, DEFAULT_RPC_URL};
use auction_client::{BidBuilder, BidVault, ChainClient};
use auction_module::{AuctionQuery, AuctionQueryResponse};
use auction_types::{parse_address, Amount, Secret};

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for commit-reveal blind auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    rpc: String,

    /// File holding prepared bids until they are revealed
    #[arg(long, default_value = "auction-vault.json")]
    vault: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the auction
    Init {
        /// Beneficiary address (hex)
        #[arg(long)]
        beneficiary: String,

        /// Bidding window length (seconds)
        #[arg(long)]
        bidding_duration: Option<u64>,

        /// Reveal window length (seconds)
        #[arg(long)]
        reveal_duration: Option<u64>,

        /// Start time (unix timestamp); defaults to the chain's current time
        #[arg(long)]
        start_time: Option<u64>,
    },

    /// Credit an account on the mock chain
    Fund {
        /// Account address (hex)
        #[arg(long)]
        address: String,

        /// Amount in base units
        #[arg(long)]
        amount: Amount,
    },

    /// Submit a blinded bid
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid value in base units (kept secret until reveal)
        #[arg(long)]
        value: Amount,

        /// Deposit in base units (visible on-chain); defaults to the value
        #[arg(long)]
        deposit: Option<Amount>,

        /// Submit a decoy that can never win
        #[arg(long)]
        fake: bool,

        /// Fixed secret label instead of a random secret
        #[arg(long)]
        secret: Option<String>,
    },

    /// Reveal all bids recorded in the vault for a sender
    Reveal {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Withdraw pending returns
    Withdraw {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Pay the highest bid to the beneficiary
    End {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Show auction status
    Status,

    /// List a bidder's stored bids
    Bids {
        /// Bidder address (hex)
        #[arg(long)]
        bidder: String,
    },

    /// Show an account's balance and pending returns
    Balance {
        /// Account address (hex)
        #[arg(long)]
        address: String,
    },

    /// List auction events
    Events {
        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Advance chain time (for testing)
    IncreaseTime {
        /// Seconds to add
        #[arg(long)]
        seconds: u64,
    },

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set; must not go backwards
        #[arg(long)]
        timestamp: u64,
    },
}

async fn bid_cmd(
    client: &ChainClient,
    vault: &mut BidVault,
    sender: &str,
    value: Amount,
    deposit: Option<Amount>,
    fake: bool,
    secret: Option<String>,
) -> Result<()> {
    let sender = parse_address(sender)?;

    let mut builder = BidBuilder::new(value).fake(fake);
    if let Some(deposit) = deposit {
        builder = builder.deposit(deposit);
    }
    if let Some(label) = secret {
        builder = builder.secret(Secret::from_label(&label)?);
    }
    let prepared = builder.build(&mut OsRng)?;

    let index = client
        .bid(&sender, &prepared.commitment, prepared.deposit)
        .await?;

    let commitment = prepared.commitment;
    let deposit = prepared.deposit;
    vault.record(sender, index, prepared);
    vault.save()?;

    info!(index, commitment = %commitment, "Bid submitted");
    println!("Bid submitted successfully");
    println!("  Index: {}", index);
    println!("  Commitment: {}", commitment);
    println!("  Deposit: {}", deposit);
    println!("  Vault: {}", vault.path().display());

    Ok(())
}

async fn reveal_cmd(client: &ChainClient, vault: &BidVault, sender: &str) -> Result<()> {
    let sender = parse_address(sender)?;
    let batch = vault.reveal_batch(&sender);
    if batch.is_empty() {
        bail!("No bids recorded in {} for this sender", vault.path().display());
    }

    let stored = client.bids(&sender).await?;
    let mismatches = batch.mismatches(&stored);
    if !mismatches.is_empty() {
        warn!(?mismatches, "Some recorded bids do not open the stored commitments");
    }

    let outcome = client.reveal(&sender, &batch).await?;

    println!("Reveal processed:");
    println!("  Accepted: {}", outcome.accepted);
    println!("  Skipped: {}", outcome.skipped);
    println!("  Credited: {}", outcome.credited);

    Ok(())
}

async fn status_cmd(client: &ChainClient) -> Result<()> {
    let block = client.block_info().await?;
    let s = client.summary().await?;

    println!("Auction:");
    println!("  Phase: {}", s.phase);
    println!("  Beneficiary: {}", hex::encode(s.beneficiary));
    println!("  Bidding End: {}", s.bidding_end);
    println!("  Reveal End: {}", s.reveal_end);
    match s.highest_bidder {
        Some(bidder) => println!("  Highest Bidder: {}", hex::encode(bidder)),
        None => println!("  Highest Bidder: none"),
    }
    println!("  Highest Bid: {}", s.highest_bid);
    println!("  Ended: {}", s.ended);
    println!("  Held: {}", s.balance);
    println!("  Pending Returns: {}", s.total_pending_returns);
    println!("  Unrevealed Deposits: {}", s.unrevealed_deposits);
    println!("  Bids: {} from {} bidders", s.num_bids, s.num_bidders);
    println!("Chain: height={}, timestamp={}", block.height, block.timestamp);

    Ok(())
}

async fn bids_cmd(client: &ChainClient, bidder: &str) -> Result<()> {
    let bidder = parse_address(bidder)?;
    let bids = client.bids(&bidder).await?;

    if bids.is_empty() {
        println!("No bids from {}", hex::encode(bidder));
    } else {
        println!("Bids from {}:", hex::encode(bidder));
        for (i, bid) in bids.iter().enumerate() {
            println!("  [{}] Commitment: {}", i, bid.commitment);
            println!("      Deposit: {}", bid.deposit);
            println!("      Revealed: {}", bid.revealed);
        }
        if let AuctionQueryResponse::Digest(digest) =
            client.query(AuctionQuery::CommitmentsDigest { bidder }).await?
        {
            println!("  Commitments Digest: {}", hex::encode(digest));
        }
    }

    Ok(())
}

async fn events_cmd(client: &ChainClient, offset: usize, limit: usize) -> Result<()> {
    let events = client.events(offset, limit).await?;

    if events.is_empty() {
        println!("No events");
    }
    for (i, event) in events.iter().enumerate() {
        println!("  [{}] {}", offset + i, serde_json::to_string(event)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = ChainClient::new(&cli.rpc)?;

    match cli.command {
        Commands::Init {
            beneficiary,
            bidding_duration,
            reveal_duration,
            start_time,
        } => {
            let config = GenesisConfigRpc {
                beneficiary,
                bidding_duration,
                reveal_duration,
                start_time,
            };
            let summary = client.init(config).await?;
            info!("Auction initialized");
            println!("Auction initialized");
            println!("  Bidding End: {}", summary.bidding_end);
            println!("  Reveal End: {}", summary.reveal_end);
        }

        Commands::Fund { address, amount } => {
            let balance = client.fund(&parse_address(&address)?, amount).await?;
            println!("Balance: {}", balance);
        }

        Commands::Bid {
            sender,
            value,
            deposit,
            fake,
            secret,
        } => {
            let mut vault = BidVault::open(&cli.vault)?;
            bid_cmd(&client, &mut vault, &sender, value, deposit, fake, secret).await?;
        }

        Commands::Reveal { sender } => {
            let vault = BidVault::open(&cli.vault)?;
            reveal_cmd(&client, &vault, &sender).await?;
        }

        Commands::Withdraw { sender } => {
            let amount = client.withdraw(&parse_address(&sender)?).await?;
            if amount == 0 {
                println!("Nothing to withdraw");
            } else {
                println!("Withdrew {}", amount);
            }
        }

        Commands::End { sender } => {
            let amount = client.end(&parse_address(&sender)?).await?;
            println!("Auction ended, {} paid to beneficiary", amount);
        }

        Commands::Status => {
            status_cmd(&client).await?;
        }

        Commands::Bids { bidder } => {
            bids_cmd(&client, &bidder).await?;
        }

        Commands::Balance { address } => {
            let address = parse_address(&address)?;
            let balance = client.balance(&address).await?;
            let pending = client.pending_returns(&address).await?;
            println!("Balance: {}", balance);
            println!("Pending Returns: {}", pending);
        }

        Commands::Events { offset, limit } => {
            events_cmd(&client, offset, limit).await?;
        }

        Commands::IncreaseTime { seconds } => {
            let info = client.increase_time(seconds).await?;
            println!("Time advanced: height={}, timestamp={}", info.height, info.timestamp);
        }

        Commands::SetTimestamp { timestamp } => {
            let info = client.set_timestamp(timestamp).await?;
            println!("Timestamp set: height={}, timestamp={}", info.height, info.timestamp);
        }
    }

    Ok(())
}
