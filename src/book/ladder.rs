// ============================================================================
// Ladder Book
// Two price ladders plus the order index, generic over the level container
// ============================================================================
//
// Every book variant is a `LadderBook` over a different `LevelMap`. The map
// only knows how to find, create and order price levels; resting-order
// bookkeeping, the id index and all invariant checks live here once.

use crate::domain::{Order, OrderBookSnapshot, OrderId, Side};
use crate::error::BookError;
use crate::interfaces::{Fill, OrderBook};
use crate::numeric::{Price, Quantity};
use std::collections::HashMap;

use super::PriceLevel;

/// Price-ordered container of levels for one side of the book.
///
/// Implementations never hold an empty level once `LadderBook` has finished
/// a mutation; they may assume `remove_level` is called as soon as a level
/// drains.
pub trait LevelMap: Clone + Send + Sync + 'static {
    const NAME: &'static str;

    fn level(&self, price: Price) -> Option<&PriceLevel>;

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel>;

    /// Existing level at `price`, or a new empty one.
    fn level_or_insert(&mut self, price: Price) -> &mut PriceLevel;

    fn remove_level(&mut self, price: Price) -> Option<PriceLevel>;

    fn lowest(&self) -> Option<&PriceLevel>;

    fn highest(&self) -> Option<&PriceLevel>;

    fn ascending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_>;

    fn descending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a resting order lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLocation {
    pub side: Side,
    pub price: Price,
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub struct LadderBook<M: LevelMap> {
    bids: M,
    asks: M,
    index: HashMap<OrderId, OrderLocation>,
}

impl<M: LevelMap> LadderBook<M> {
    pub fn with_levels(bids: M, asks: M, expected_orders: usize) -> Self {
        Self {
            bids,
            asks,
            index: HashMap::with_capacity(expected_orders),
        }
    }

    #[inline]
    fn ladder(&self, side: Side) -> &M {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    fn ladder_mut(&mut self, side: Side) -> &mut M {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Best level on `side`: highest bid, lowest ask.
    #[inline]
    fn best_level(&self, side: Side) -> Option<&PriceLevel> {
        match side {
            Side::Bid => self.bids.highest(),
            Side::Ask => self.asks.lowest(),
        }
    }

    /// Levels on `side` from best to worst.
    fn best_first(&self, side: Side) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            Side::Bid => self.bids.descending(),
            Side::Ask => self.asks.ascending(),
        }
    }

    pub fn location(&self, id: OrderId) -> Option<OrderLocation> {
        self.index.get(&id).copied()
    }

    fn check_side(&self, side: Side) -> Result<usize, BookError> {
        let mut resting = 0;
        let mut previous: Option<Price> = None;
        for level in self.best_first(side) {
            level.check()?;
            if let Some(prev) = previous {
                let ordered = match side {
                    Side::Bid => level.price() < prev,
                    Side::Ask => level.price() > prev,
                };
                if !ordered {
                    return Err(BookError::LevelCorrupted {
                        price: level.price(),
                        detail: format!("{side} ladder out of order after {prev}"),
                    });
                }
            }
            previous = Some(level.price());

            for order in level.iter() {
                let expected = OrderLocation {
                    side,
                    price: level.price(),
                    sequence: order.sequence,
                };
                match self.index.get(&order.id) {
                    Some(location) if *location == expected && order.side == side => {},
                    Some(location) => {
                        return Err(BookError::IndexCorrupted {
                            id: order.id,
                            detail: format!("indexed at {location:?}, resting at {expected:?}"),
                        })
                    },
                    None => {
                        return Err(BookError::IndexCorrupted {
                            id: order.id,
                            detail: "resting order missing from index".into(),
                        })
                    },
                }
                resting += 1;
            }
        }
        Ok(resting)
    }
}

impl<M: LevelMap> OrderBook for LadderBook<M> {
    fn variant(&self) -> &'static str {
        M::NAME
    }

    fn add_order(&mut self, order: Order) -> Result<(), BookError> {
        if order.remaining() == 0 {
            return Err(BookError::ZeroQuantity { id: order.id });
        }
        if order.is_market() {
            return Err(BookError::NotRestable { id: order.id });
        }
        if self.index.contains_key(&order.id) {
            return Err(BookError::DuplicateOrderId(order.id));
        }

        let location = OrderLocation {
            side: order.side,
            price: order.price,
            sequence: order.sequence,
        };
        let ladder = self.ladder_mut(order.side);
        let level = ladder.level_or_insert(order.price);
        if let Err(err) = level.push(order) {
            if level.is_empty() {
                ladder.remove_level(order.price);
            }
            return Err(err);
        }
        self.index.insert(order.id, location);
        Ok(())
    }

    fn cancel_order(&mut self, id: OrderId) -> Result<bool, BookError> {
        let Some(location) = self.index.get(&id).copied() else {
            return Ok(false);
        };

        let ladder = self.ladder_mut(location.side);
        let level = ladder
            .level_mut(location.price)
            .ok_or_else(|| BookError::IndexCorrupted {
                id,
                detail: format!("no level at {}", location.price),
            })?;
        if level.get(location.sequence).map(|order| order.id) != Some(id) {
            return Err(BookError::IndexCorrupted {
                id,
                detail: format!("not queued at {} under sequence {}", location.price, location.sequence),
            });
        }
        level.remove(location.sequence);
        if level.is_empty() {
            ladder.remove_level(location.price);
        }
        self.index.remove(&id);
        Ok(true)
    }

    fn best_bid(&self) -> Option<Price> {
        self.bids.highest().map(PriceLevel::price)
    }

    fn best_ask(&self) -> Option<Price> {
        self.asks.lowest().map(PriceLevel::price)
    }

    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order> {
        let mut eligible = Vec::new();
        if quantity == 0 {
            return eligible;
        }
        let mut covered: Quantity = 0;
        for level in self.best_first(side.opposite()) {
            if let Some(limit) = limit {
                let acceptable = match side {
                    Side::Bid => level.price() <= limit,
                    Side::Ask => level.price() >= limit,
                };
                if !acceptable {
                    break;
                }
            }
            for order in level.iter() {
                eligible.push(*order);
                covered = covered.saturating_add(order.remaining());
                if covered >= quantity {
                    return eligible;
                }
            }
        }
        eligible
    }

    fn snapshot(&self) -> OrderBookSnapshot {
        OrderBookSnapshot::from_ladders(
            self.bids.descending().map(PriceLevel::summary).collect(),
            self.asks.ascending().map(PriceLevel::summary).collect(),
        )
    }

    fn order(&self, id: OrderId) -> Option<&Order> {
        let location = self.index.get(&id)?;
        self.ladder(location.side)
            .level(location.price)?
            .get(location.sequence)
    }

    fn front(&self, side: Side) -> Option<&Order> {
        self.best_level(side)?.front()
    }

    fn fill_front(&mut self, side: Side, quantity: Quantity) -> Result<Fill, BookError> {
        let (price, maker_id) = match self.best_level(side) {
            Some(level) => match level.front() {
                Some(order) => (level.price(), order.id),
                None => {
                    return Err(BookError::LevelCorrupted {
                        price: level.price(),
                        detail: "best level is empty".into(),
                    })
                },
            },
            None => return Err(BookError::EmptySide(side)),
        };
        if !self.index.contains_key(&maker_id) {
            return Err(BookError::IndexCorrupted {
                id: maker_id,
                detail: "front order missing from index".into(),
            });
        }

        let ladder = self.ladder_mut(side);
        let level = ladder.level_mut(price).ok_or(BookError::EmptySide(side))?;
        let before = *level.front().ok_or(BookError::EmptySide(side))?;
        let (taken, maker) = level.fill_front(quantity).ok_or(BookError::EmptySide(side))?;
        let drained = level.is_empty();
        if drained {
            ladder.remove_level(price);
        }
        if maker.is_filled() {
            self.index.remove(&maker_id);
        }

        Ok(Fill {
            maker_id,
            price,
            quantity: taken,
            maker_remaining: maker.remaining(),
            before,
        })
    }

    fn restore(&mut self, order: Order) -> Result<(), BookError> {
        if order.remaining() == 0 || order.is_market() {
            return Err(BookError::NotRestable { id: order.id });
        }
        let location = OrderLocation {
            side: order.side,
            price: order.price,
            sequence: order.sequence,
        };
        if let Some(indexed) = self.index.get(&order.id) {
            if *indexed != location {
                return Err(BookError::IndexCorrupted {
                    id: order.id,
                    detail: format!("restoring to {location:?} but indexed at {indexed:?}"),
                });
            }
        }

        let ladder = self.ladder_mut(order.side);
        let level = ladder.level_or_insert(order.price);
        if let Err(err) = level.restore(order) {
            if level.is_empty() {
                ladder.remove_level(order.price);
            }
            return Err(err);
        }
        self.index.insert(order.id, location);
        Ok(())
    }

    fn order_count(&self) -> usize {
        self.index.len()
    }

    fn level_count(&self, side: Side) -> usize {
        self.ladder(side).len()
    }

    fn check_invariants(&self) -> Result<(), BookError> {
        let resting = self.check_side(Side::Bid)? + self.check_side(Side::Ask)?;
        if resting != self.index.len() {
            return Err(BookError::IndexCorrupted {
                id: OrderId(0),
                detail: format!("{} orders resting but {} indexed", resting, self.index.len()),
            });
        }
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                return Err(BookError::LevelCorrupted {
                    price: bid,
                    detail: format!("book crossed against ask {ask}"),
                });
            }
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn OrderBook> {
        Box::new(self.clone())
    }
}
