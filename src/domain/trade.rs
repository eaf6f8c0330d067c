// ============================================================================
// Trade Domain Model
// ============================================================================

use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;

use super::{OrderId, Side};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single pairing produced by the matching algorithm. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    /// Order ID of the aggressive order (incoming)
    pub taker_order_id: OrderId,

    /// Order ID of the passive order (resting in book)
    pub maker_order_id: OrderId,

    /// Side of the aggressor
    pub taker_side: Side,

    /// Execution price, always the maker's price
    pub price: Price,

    pub quantity: Quantity,

    /// Clock nanoseconds at execution
    pub timestamp: u64,
}

impl Trade {
    pub fn new(
        taker_order_id: OrderId,
        maker_order_id: OrderId,
        taker_side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: u64,
    ) -> Self {
        Self {
            taker_order_id,
            maker_order_id,
            taker_side,
            price,
            quantity,
            timestamp,
        }
    }

    /// Exact price × quantity, or `None` past `Decimal`'s range.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.to_decimal().checked_mul(Decimal::from(self.quantity))
    }
}
