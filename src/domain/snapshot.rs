// ============================================================================
// Order Book Snapshot
// Independent, fully owned copy of the ladder taken at one instant
// ============================================================================

use crate::numeric::{Price, Quantity};

use super::Side;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Aggregate interest at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSummary {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

/// Best prices read together from one book state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TopOfBook {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub version: u64,
}

impl TopOfBook {
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid, self.best_ask), (Some(bid), Some(ask)) if bid >= ask)
    }
}

/// Top of book as published to market data consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quote {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub version: u64,
    /// Clock nanoseconds when the quote was read
    pub timestamp: u64,
}

/// Immutable snapshot of the order book state.
///
/// Bids are ordered best (highest) first, asks best (lowest) first. A snapshot
/// has no link back to the book that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    /// Version of the book state this snapshot was taken from
    pub version: u64,
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

impl OrderBookSnapshot {
    pub fn empty(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Build from best-first ladders; best prices are taken from the ladders.
    pub fn from_ladders(bids: Vec<LevelSummary>, asks: Vec<LevelSummary>) -> Self {
        let best_bid = bids.first().map(|level| level.price);
        let best_ask = asks.first().map(|level| level.price);
        Self {
            version: 0,
            bids,
            asks,
            best_bid,
            best_ask,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.best_bid,
            best_ask: self.best_ask,
            version: self.version,
        }
    }

    /// Best ask minus best bid
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid).ok(),
            _ => None,
        }
    }

    /// Midpoint, rounded down to the price grid
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => {
                let sum = bid.raw_value() as i128 + ask.raw_value() as i128;
                Some(Price::from_raw((sum / 2) as i64))
            },
            _ => None,
        }
    }

    pub fn total_bid_quantity(&self) -> Quantity {
        self.bids.iter().map(|level| level.quantity).sum()
    }

    pub fn total_ask_quantity(&self) -> Quantity {
        self.asks.iter().map(|level| level.quantity).sum()
    }

    /// Aggregate quantity resting at `price` on `side`, zero if absent.
    pub fn quantity_at(&self, side: Side, price: Price) -> Quantity {
        let ladder = match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        };
        ladder
            .iter()
            .find(|level| level.price == price)
            .map_or(0, |level| level.quantity)
    }

    /// Copy limited to the best `levels` prices per side.
    pub fn depth(&self, levels: usize) -> Self {
        Self {
            version: self.version,
            bids: self.bids.iter().take(levels).copied().collect(),
            asks: self.asks.iter().take(levels).copied().collect(),
            best_bid: self.best_bid,
            best_ask: self.best_ask,
        }
    }

    /// Check that the snapshot describes a state the book could be in.
    pub fn check_consistency(&self) -> Result<(), &'static str> {
        if self.bids.windows(2).any(|pair| pair[0].price <= pair[1].price) {
            return Err("bid ladder is not strictly descending");
        }
        if self.asks.windows(2).any(|pair| pair[0].price >= pair[1].price) {
            return Err("ask ladder is not strictly ascending");
        }
        if self
            .bids
            .iter()
            .chain(self.asks.iter())
            .any(|level| level.quantity == 0 || level.order_count == 0)
        {
            return Err("empty price level present in ladder");
        }
        if self.best_bid != self.bids.first().map(|level| level.price)
            || self.best_ask != self.asks.first().map(|level| level.price)
        {
            return Err("best prices disagree with ladders");
        }
        if let (Some(bid), Some(ask)) = (self.best_bid, self.best_ask) {
            if bid >= ask {
                return Err("book is crossed");
            }
        }
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.check_consistency().is_ok()
    }
}
