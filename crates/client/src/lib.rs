//! Client SDK for bidding in blind auctions.
//!
//! This crate provides a high-level API for:
//! - Blinding bids and generating secrets
//! - Building ordered reveal batches
//! - Keeping prepared bids in a local vault until the reveal window opens
//! - Typed access to the mock chain's JSON-RPC interface

pub mod bid;
pub mod reveal;
pub mod rpc;
pub mod vault;

pub use auction_types::blind_bid;
pub use bid::{prepare_bid, random_secret, BidBuilder, BidError, PreparedBid};
pub use reveal::RevealBatch;
pub use rpc::ChainClient;
pub use vault::{BidVault, VaultError};
