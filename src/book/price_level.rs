// ============================================================================
// Price Level
// FIFO queue of resting orders at one price with a cached aggregate
// ============================================================================

use crate::domain::{LevelSummary, Order};
use crate::error::BookError;
use crate::numeric::{Price, Quantity};
use std::collections::BTreeMap;

/// All resting orders at a single price, in arrival order.
///
/// Orders are keyed by arrival sequence, so the front of the map is the
/// oldest order and a cancel can remove from the middle in O(log n).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    price: Price,
    orders: BTreeMap<u64, Order>,
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: BTreeMap::new(),
            total_quantity: 0,
        }
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    #[inline]
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Append an order. It must arrive after every order already queued.
    pub fn push(&mut self, order: Order) -> Result<(), BookError> {
        if order.price != self.price {
            return Err(BookError::LevelCorrupted {
                price: self.price,
                detail: format!("order {} priced at {}", order.id, order.price),
            });
        }
        if let Some((&last, _)) = self.orders.last_key_value() {
            if order.sequence <= last {
                return Err(BookError::LevelCorrupted {
                    price: self.price,
                    detail: format!(
                        "order {} sequence {} does not follow {}",
                        order.id, order.sequence, last
                    ),
                });
            }
        }
        self.total_quantity += order.remaining();
        self.orders.insert(order.sequence, order);
        Ok(())
    }

    /// Oldest order at this price
    #[inline]
    pub fn front(&self) -> Option<&Order> {
        self.orders.first_key_value().map(|(_, order)| order)
    }

    /// Fill up to `quantity` of the front order. Returns the quantity taken
    /// and the maker as it stands after the fill; an exhausted maker has
    /// already been removed from the level.
    pub fn fill_front(&mut self, quantity: Quantity) -> Option<(Quantity, Order)> {
        let mut entry = self.orders.first_entry()?;
        let taken = entry.get_mut().fill(quantity);
        self.total_quantity -= taken;
        let maker = *entry.get();
        if maker.is_filled() {
            entry.remove();
        }
        Some((taken, maker))
    }

    /// Undo a `fill_front`: put `order` back at the front of the queue,
    /// replacing what is left of it if it was only partly filled.
    pub fn restore(&mut self, order: Order) -> Result<(), BookError> {
        if order.price != self.price {
            return Err(BookError::LevelCorrupted {
                price: self.price,
                detail: format!("restored order {} priced at {}", order.id, order.price),
            });
        }
        match self.orders.first_key_value() {
            Some((&first, resting)) if first == order.sequence => {
                if resting.id != order.id {
                    return Err(BookError::LevelCorrupted {
                        price: self.price,
                        detail: format!("sequence {} held by {}, not {}", first, resting.id, order.id),
                    });
                }
                self.total_quantity -= resting.remaining();
            },
            Some((&first, _)) if first < order.sequence => {
                return Err(BookError::LevelCorrupted {
                    price: self.price,
                    detail: format!("order {} would not be front after restore", order.id),
                });
            },
            _ => {},
        }
        self.total_quantity += order.remaining();
        self.orders.insert(order.sequence, order);
        Ok(())
    }

    /// Remove the order that arrived with `sequence`.
    pub fn remove(&mut self, sequence: u64) -> Option<Order> {
        let order = self.orders.remove(&sequence)?;
        self.total_quantity -= order.remaining();
        Some(order)
    }

    pub fn get(&self, sequence: u64) -> Option<&Order> {
        self.orders.get(&sequence)
    }

    /// Orders in time priority
    pub fn iter(&self) -> impl Iterator<Item = &Order> + '_ {
        self.orders.values()
    }

    pub fn summary(&self) -> LevelSummary {
        LevelSummary {
            price: self.price,
            quantity: self.total_quantity,
            order_count: self.orders.len(),
        }
    }

    /// Recompute the aggregate and compare against the cached value.
    pub fn check(&self) -> Result<(), BookError> {
        if self.orders.is_empty() {
            return Err(BookError::LevelCorrupted {
                price: self.price,
                detail: "empty level left in ladder".into(),
            });
        }
        let mut sum: Quantity = 0;
        for (&sequence, order) in &self.orders {
            if order.sequence != sequence || order.price != self.price {
                return Err(BookError::LevelCorrupted {
                    price: self.price,
                    detail: format!("order {} filed under the wrong key", order.id),
                });
            }
            if order.is_filled() {
                return Err(BookError::LevelCorrupted {
                    price: self.price,
                    detail: format!("filled order {} still resting", order.id),
                });
            }
            sum += order.remaining();
        }
        if sum != self.total_quantity {
            return Err(BookError::LevelCorrupted {
                price: self.price,
                detail: format!("cached total {} but orders sum to {}", self.total_quantity, sum),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, Side};

    fn bid(id: u64, quantity: Quantity, sequence: u64) -> Order {
        Order::limit(OrderId(id), Side::Bid, "10.00".parse().unwrap(), quantity, sequence)
    }

    #[test]
    fn test_fifo_fill_and_aggregate() {
        let mut level = PriceLevel::new("10.00".parse().unwrap());
        level.push(bid(1, 100, 1)).unwrap();
        level.push(bid(2, 50, 2)).unwrap();
        assert_eq!(level.total_quantity(), 150);

        let (taken, maker) = level.fill_front(120).unwrap();
        assert_eq!(taken, 100);
        assert_eq!(maker.id, OrderId(1));
        assert!(maker.is_filled());
        assert_eq!(level.len(), 1);

        let (taken, maker) = level.fill_front(20).unwrap();
        assert_eq!(taken, 20);
        assert_eq!(maker.remaining(), 30);
        assert_eq!(level.front().map(|o| o.remaining()), Some(30));
        assert_eq!(level.total_quantity(), 30);
        assert!(level.check().is_ok());
    }

    #[test]
    fn test_remove_from_middle() {
        let mut level = PriceLevel::new("10.00".parse().unwrap());
        for (id, seq) in [(1, 1), (2, 2), (3, 3)] {
            level.push(bid(id, 10, seq)).unwrap();
        }
        assert_eq!(level.remove(2).map(|o| o.id), Some(OrderId(2)));
        assert!(level.remove(2).is_none());
        let ids: Vec<_> = level.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(level.summary().quantity, 20);
    }

    #[test]
    fn test_push_rejects_wrong_price_and_stale_sequence() {
        let mut level = PriceLevel::new("10.00".parse().unwrap());
        level.push(bid(1, 10, 5)).unwrap();
        assert!(level.push(bid(2, 10, 5)).is_err());
        let other = Order::limit(OrderId(3), Side::Bid, "9.00".parse().unwrap(), 1, 9);
        assert!(level.push(other).is_err());
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn test_restore_puts_maker_back_in_front() {
        let mut level = PriceLevel::new("10.00".parse().unwrap());
        let first = bid(1, 100, 1);
        level.push(first).unwrap();
        level.push(bid(2, 50, 2)).unwrap();

        level.fill_front(100).unwrap();
        level.fill_front(20).unwrap();
        level.restore(bid(2, 50, 2)).unwrap();
        level.restore(first).unwrap();

        let queued: Vec<_> = level.iter().map(|o| (o.id.0, o.remaining())).collect();
        assert_eq!(queued, vec![(1, 100), (2, 50)]);
        assert_eq!(level.total_quantity(), 150);
        assert!(level.check().is_ok());

        // Behind an older order, or under someone else's sequence
        assert!(level.restore(bid(3, 10, 5)).is_err());
        assert!(level.restore(bid(3, 10, 1)).is_err());
        assert_eq!(level.total_quantity(), 150);
    }

    #[test]
    fn test_empty_level_fails_check() {
        let level = PriceLevel::new(Price::ONE);
        assert!(level.check().is_err());
    }
}
