// ============================================================================
// Execution Result
// What one wrapper mutation did to the book
// ============================================================================

use crate::numeric::Quantity;
use smallvec::SmallVec;

use super::Trade;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trades produced by one incoming order. Small sweeps stay on the stack.
pub type TradeBuffer = SmallVec<[Trade; 8]>;

/// Final disposition of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionOutcome {
    /// Limit remainder now rests in the book
    Rested { remaining: Quantity },
    /// Incoming order fully filled
    Filled,
    /// Market remainder with no interest left, discarded
    Unfilled { discarded: Quantity },
    /// Refused without touching the book
    Rejected { reason: String },
    Cancelled,
    /// Cancel for an id that is not resting
    UnknownOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Execution {
    /// Book version after the mutation
    pub version: u64,
    pub trades: TradeBuffer,
    pub outcome: ExecutionOutcome,
}

impl Execution {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            version: 0,
            trades: TradeBuffer::new(),
            outcome,
        }
    }

    /// True when the book state changed.
    pub fn mutated(&self) -> bool {
        !matches!(
            self.outcome,
            ExecutionOutcome::Rejected { .. } | ExecutionOutcome::UnknownOrder
        ) && (!self.trades.is_empty()
            || matches!(
                self.outcome,
                ExecutionOutcome::Rested { .. } | ExecutionOutcome::Cancelled
            ))
    }
}
