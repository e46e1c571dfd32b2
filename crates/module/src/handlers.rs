//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Each one
//! checks every hard precondition before mutating state, so a returned error
//! means nothing changed.

use crate::call::AuctionCall;
use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::payout::Payout;
use crate::state::AuctionState;
use auction_types::{verify_opening, Address, Amount, Bid, Commitment, Secret};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::{debug, info, warn};

/// Context provided by the host for each call.
#[derive(Clone, Debug)]
pub struct CallContext {
    /// Sender of the call
    pub sender: Address,
    /// Current timestamp
    pub timestamp: u64,
    /// Value attached to the call (for deposits)
    pub value: Amount,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Summary of a reveal call.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealOutcome {
    /// Slots opened by a matching triple
    pub accepted: u32,
    /// Slots ignored (mismatch or already revealed)
    pub skipped: u32,
    /// Amount added to the sender's pending returns
    #[serde_as(as = "DisplayFromStr")]
    pub credited: Amount,
}

/// Result of a dispatched call.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Committed {
        index: u32,
    },
    Revealed(RevealOutcome),
    Withdrawn {
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
    Ended {
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
}

/// Route a call message to its handler.
pub fn dispatch<P: Payout>(
    state: &mut AuctionState,
    ctx: &CallContext,
    call: AuctionCall,
    payout: &mut P,
) -> HandlerResult<CallOutcome> {
    match call {
        AuctionCall::Bid { commitment } => {
            handle_bid(state, ctx, commitment).map(|index| CallOutcome::Committed { index })
        }
        AuctionCall::Reveal {
            values,
            fakes,
            secrets,
        } => handle_reveal(state, ctx, &values, &fakes, &secrets).map(CallOutcome::Revealed),
        AuctionCall::Withdraw => {
            handle_withdraw(state, ctx, payout).map(|amount| CallOutcome::Withdrawn { amount })
        }
        AuctionCall::AuctionEnd => {
            handle_auction_end(state, ctx, payout).map(|amount| CallOutcome::Ended { amount })
        }
    }
}

/// Handle Bid call.
///
/// Rejected once the auction has ended, whatever the supplied timestamp.
/// The attached value is the deposit. Returns the bid's position in the
/// sender's list.
pub fn handle_bid(
    state: &mut AuctionState,
    ctx: &CallContext,
    commitment: Commitment,
) -> HandlerResult<u32> {
    if ctx.timestamp >= state.bidding_end {
        return Err(AuctionError::TooLate {
            deadline: state.bidding_end,
        });
    }
    if state.ended {
        return Err(AuctionError::AuctionEndAlreadyCalled);
    }

    let balance = state
        .balance
        .checked_add(ctx.value)
        .ok_or(AuctionError::ArithmeticOverflow)?;
    let index = u32::try_from(state.get_bids(&ctx.sender).len())
        .map_err(|_| AuctionError::ArithmeticOverflow)?;

    state.balance = balance;
    state
        .bids
        .entry(ctx.sender)
        .or_default()
        .push(Bid::new(commitment, ctx.value));

    state.emit(AuctionEvent::BidCommitted {
        bidder: ctx.sender,
        index,
        deposit: ctx.value,
    });

    debug!(
        bidder = %hex::encode(ctx.sender),
        index,
        deposit = %ctx.value,
        "Bid committed"
    );

    Ok(index)
}

/// Handle Reveal call.
///
/// Triples are matched by position against the sender's bids. Slots whose
/// triple does not open the stored commitment, or that were already revealed,
/// are skipped without error and credit nothing.
pub fn handle_reveal(
    state: &mut AuctionState,
    ctx: &CallContext,
    values: &[Amount],
    fakes: &[bool],
    secrets: &[Secret],
) -> HandlerResult<RevealOutcome> {
    if ctx.timestamp < state.bidding_end {
        return Err(AuctionError::TooEarly {
            deadline: state.bidding_end,
        });
    }
    if ctx.timestamp >= state.reveal_end {
        return Err(AuctionError::TooLate {
            deadline: state.reveal_end,
        });
    }
    if state.ended {
        return Err(AuctionError::AuctionEndAlreadyCalled);
    }
    if values.len() != fakes.len() || values.len() != secrets.len() {
        return Err(AuctionError::RevealLengthMismatch {
            values: values.len(),
            fakes: fakes.len(),
            secrets: secrets.len(),
        });
    }
    let stored = state.get_bids(&ctx.sender).len();
    if values.len() > stored {
        return Err(AuctionError::TooManyReveals {
            revealed: values.len(),
            stored,
        });
    }

    let mut outcome = RevealOutcome::default();
    let mut refund: Amount = 0;

    for (index, ((&value, &fake), secret)) in values.iter().zip(fakes).zip(secrets).enumerate() {
        let slot = state
            .bids
            .get_mut(&ctx.sender)
            .and_then(|bids| bids.get_mut(index));

        let deposit = match slot {
            Some(bid) if !bid.revealed && verify_opening(&bid.commitment, value, fake, secret) => {
                bid.revealed = true;
                bid.deposit
            }
            Some(bid) => {
                debug!(
                    bidder = %hex::encode(ctx.sender),
                    index,
                    already_revealed = bid.revealed,
                    "Reveal slot skipped"
                );
                outcome.skipped += 1;
                continue;
            }
            None => continue,
        };

        outcome.accepted += 1;
        refund += deposit;

        state.emit(AuctionEvent::BidRevealed {
            bidder: ctx.sender,
            index: index as u32,
            value,
            fake,
        });

        if !fake && deposit >= value && place_bid(state, ctx.sender, value) {
            refund -= value;
        } else if !fake && value > deposit {
            debug!(
                bidder = %hex::encode(ctx.sender),
                index,
                value = %value,
                deposit = %deposit,
                "Revealed value exceeds deposit"
            );
        }
    }

    if refund > 0 {
        state.add_pending_return(ctx.sender, refund);
    }
    outcome.credited = refund;

    Ok(outcome)
}

/// Make `value` the leading bid if it beats the current one.
///
/// The displaced leader's amount becomes reclaimable by them.
fn place_bid(state: &mut AuctionState, bidder: Address, value: Amount) -> bool {
    if value <= state.highest_bid {
        return false;
    }
    if let Some(previous) = state.highest_bidder {
        state.add_pending_return(previous, state.highest_bid);
    }
    state.highest_bid = value;
    state.highest_bidder = Some(bidder);

    state.emit(AuctionEvent::HighestBidIncreased {
        bidder,
        amount: value,
    });

    info!(
        bidder = %hex::encode(bidder),
        amount = %value,
        "New highest bid"
    );

    true
}

/// Handle Withdraw call.
///
/// The pending balance is zeroed before the transfer is attempted. Any host
/// that allows the payout to call back into the engine relies on this order.
/// A failed transfer restores the balance and aborts.
pub fn handle_withdraw<P: Payout>(
    state: &mut AuctionState,
    ctx: &CallContext,
    payout: &mut P,
) -> HandlerResult<Amount> {
    let amount = state.take_pending_return(&ctx.sender);
    if amount == 0 {
        return Ok(0);
    }
    state.balance -= amount;

    if let Err(e) = payout.transfer(&ctx.sender, amount) {
        state.balance += amount;
        state.add_pending_return(ctx.sender, amount);
        warn!(
            bidder = %hex::encode(ctx.sender),
            amount = %amount,
            error = %e,
            "Withdrawal transfer failed"
        );
        return Err(AuctionError::TransferFailed(e.to_string()));
    }

    state.emit(AuctionEvent::Withdrawal {
        bidder: ctx.sender,
        amount,
    });

    info!(
        bidder = %hex::encode(ctx.sender),
        amount = %amount,
        "Pending returns withdrawn"
    );

    Ok(amount)
}

/// Handle AuctionEnd call.
///
/// Returns the amount paid to the beneficiary.
pub fn handle_auction_end<P: Payout>(
    state: &mut AuctionState,
    ctx: &CallContext,
    payout: &mut P,
) -> HandlerResult<Amount> {
    if ctx.timestamp < state.reveal_end {
        return Err(AuctionError::TooEarly {
            deadline: state.reveal_end,
        });
    }
    if state.ended {
        return Err(AuctionError::AuctionEndAlreadyCalled);
    }

    let amount = state.highest_bid;
    state.ended = true;

    if amount > 0 {
        state.balance -= amount;
        if let Err(e) = payout.transfer(&state.beneficiary, amount) {
            state.balance += amount;
            state.ended = false;
            warn!(amount = %amount, error = %e, "Beneficiary transfer failed");
            return Err(AuctionError::TransferFailed(e.to_string()));
        }
    }

    state.emit(AuctionEvent::AuctionEnded {
        winner: state.highest_bidder,
        amount,
    });

    info!(
        winner = ?state.highest_bidder.map(hex::encode),
        amount = %amount,
        beneficiary = %hex::encode(state.beneficiary),
        "Auction ended"
    );

    Ok(amount)
}
