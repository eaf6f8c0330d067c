// ============================================================================
// Order Domain Model
// ============================================================================

use crate::numeric::{Price, Quantity};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Order identifier assigned by the admission collaborator. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    /// Matches while the resting price is at least as good as `price`,
    /// remainder rests in the book
    Limit,
    /// Matches at any available price, remainder is discarded
    Market,
}

// ============================================================================
// Order Entity
// ============================================================================

/// An admitted order.
///
/// Everything but the remaining quantity is fixed at admission. Only the book
/// reduces `remaining`, and only on the writer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price. Ignored for market orders.
    pub price: Price,
    /// Original quantity
    pub quantity: Quantity,
    /// Arrival sequence, strictly increasing across admitted commands
    pub sequence: u64,
    remaining: Quantity,
}

impl Order {
    pub fn limit(id: OrderId, side: Side, price: Price, quantity: Quantity, sequence: u64) -> Self {
        Self {
            id,
            side,
            order_type: OrderType::Limit,
            price,
            quantity,
            sequence,
            remaining: quantity,
        }
    }

    pub fn market(id: OrderId, side: Side, quantity: Quantity, sequence: u64) -> Self {
        Self {
            id,
            side,
            order_type: OrderType::Market,
            price: Price::ZERO,
            quantity,
            sequence,
            remaining: quantity,
        }
    }

    #[inline]
    pub fn remaining(&self) -> Quantity {
        self.remaining
    }

    #[inline]
    pub fn filled(&self) -> Quantity {
        self.quantity - self.remaining
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    #[inline]
    pub fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    /// Reduce the remaining quantity, returning the amount actually taken.
    #[inline]
    pub(crate) fn fill(&mut self, quantity: Quantity) -> Quantity {
        let taken = quantity.min(self.remaining);
        self.remaining -= taken;
        taken
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Item carried by the input channel. Cancels share the channel so the engine
/// stays the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderCommand {
    New(Order),
    Cancel { id: OrderId, sequence: u64 },
}

impl OrderCommand {
    #[inline]
    pub fn sequence(&self) -> u64 {
        match self {
            OrderCommand::New(order) => order.sequence,
            OrderCommand::Cancel { sequence, .. } => *sequence,
        }
    }

    #[inline]
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderCommand::New(order) => order.id,
            OrderCommand::Cancel { id, .. } => *id,
        }
    }
}

impl From<Order> for OrderCommand {
    fn from(order: Order) -> Self {
        OrderCommand::New(order)
    }
}
