//! Blind auction engine.
//!
//! This module implements the settlement logic of a commit-reveal auction:
//!
//! - Blinded bid submission with deposits during the bidding window
//! - Positional reveal of `(value, fake, secret)` triples during the reveal window
//! - Pending-returns bookkeeping and withdrawal for outbid or fake bids
//! - One-shot settlement paying the highest bid to the beneficiary
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: Engine state
//! - `events`: Events appended by handlers
//! - `payout`: Outbound transfer seam and an in-memory ledger
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! Every handler takes `&mut AuctionState` and either applies its whole effect
//! or returns an error without touching state. Hosts must serialize calls.
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{handlers, AuctionState, CallContext, Ledger};
//!
//! let mut state = AuctionState::new(beneficiary, now, 3 * DAY, 2 * DAY)?;
//! let ctx = CallContext { sender, timestamp: now, value: deposit };
//!
//! handlers::handle_bid(&mut state, &ctx, commitment)?;
//! // ... after bidding_end
//! handlers::handle_reveal(&mut state, &ctx, &values, &fakes, &secrets)?;
//! // ... after reveal_end
//! handlers::handle_auction_end(&mut state, &ctx, &mut ledger)?;
//! ```

pub mod call;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod payout;
pub mod queries;
pub mod state;

pub use call::AuctionCall;
pub use error::AuctionError;
pub use events::AuctionEvent;
pub use genesis::{AuctionGenesisConfig, AuctionTiming, GenesisValidationError};
pub use handlers::{CallContext, CallOutcome, HandlerResult, RevealOutcome};
pub use payout::{Ledger, Payout};
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use state::AuctionState;
