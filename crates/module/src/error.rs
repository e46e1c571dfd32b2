//! Auction module error types.

use thiserror::Error;

/// Errors that can occur in the auction module.
///
/// Any error aborts the whole call: state is exactly as it was before.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Too late: deadline {deadline} has passed")]
    TooLate { deadline: u64 },

    #[error("Too early: not available before {deadline}")]
    TooEarly { deadline: u64 },

    #[error("Auction end already called")]
    AuctionEndAlreadyCalled,

    #[error("Invalid timing configuration")]
    InvalidTiming,

    #[error("Reveal length mismatch: {values} values, {fakes} fake flags, {secrets} secrets")]
    RevealLengthMismatch {
        values: usize,
        fakes: usize,
        secrets: usize,
    },

    #[error("Too many reveals: {revealed} given, {stored} bids stored")]
    TooManyReveals { revealed: usize, stored: usize },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}
