//! Outbound fund transfers.
//!
//! The engine never moves money itself. `withdraw` and `auction_end` hand the
//! amount to a host-provided [`Payout`] after the engine's own bookkeeping has
//! been updated.

use auction_types::{Address, Amount};
use std::collections::HashMap;
use thiserror::Error;

/// Host-side transfer of funds out of the engine.
pub trait Payout {
    type Error: std::fmt::Display;

    /// Credit `amount` to `to`. An error aborts the calling operation.
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), Self::Error>;
}

/// Errors raised by the in-memory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Balance overflow")]
    Overflow,
}

/// In-memory account balances.
///
/// Used by the mock chain as its account model and by tests to observe
/// payouts.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    balances: HashMap<Address, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an account's balance.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Add to an account's balance.
    pub fn credit(&mut self, address: Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Subtract from an account's balance.
    pub fn debit(&mut self, address: &Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if let Some(balance) = self.balances.get_mut(address) {
            *balance -= amount;
        }
        Ok(())
    }
}

impl Payout for Ledger {
    type Error = LedgerError;

    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), Self::Error> {
        self.credit(*to, amount)
    }
}
