// ============================================================================
// Ordered Map Book
// Balanced-tree ladder; the reference variant every other one must match
// ============================================================================

use crate::numeric::Price;
use std::collections::BTreeMap;

use super::{LadderBook, LevelMap, PriceLevel};

/// Price levels in a `BTreeMap`. O(log n) everywhere, no tuning.
#[derive(Debug, Clone, Default)]
pub struct TreeLevels {
    levels: BTreeMap<Price, PriceLevel>,
}

impl LevelMap for TreeLevels {
    const NAME: &'static str = "ordered-map";

    fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    fn level_or_insert(&mut self, price: Price) -> &mut PriceLevel {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
    }

    fn remove_level(&mut self, price: Price) -> Option<PriceLevel> {
        self.levels.remove(&price)
    }

    fn lowest(&self) -> Option<&PriceLevel> {
        self.levels.values().next()
    }

    fn highest(&self) -> Option<&PriceLevel> {
        self.levels.values().next_back()
    }

    fn ascending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        Box::new(self.levels.values())
    }

    fn descending(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        Box::new(self.levels.values().rev())
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

pub type OrderedMapBook = LadderBook<TreeLevels>;

impl OrderedMapBook {
    pub fn new(expected_orders: usize) -> Self {
        Self::with_levels(TreeLevels::default(), TreeLevels::default(), expected_orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderId, Side};
    use crate::error::BookError;
    use crate::interfaces::OrderBook;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn limit(id: u64, side: Side, px: &str, qty: u64, seq: u64) -> Order {
        Order::limit(OrderId(id), side, price(px), qty, seq)
    }

    #[test]
    fn test_best_prices() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "9.98", 10, 1)).unwrap();
        book.add_order(limit(2, Side::Bid, "9.99", 10, 2)).unwrap();
        book.add_order(limit(3, Side::Ask, "10.02", 10, 3)).unwrap();
        book.add_order(limit(4, Side::Ask, "10.01", 10, 4)).unwrap();

        assert_eq!(book.best_bid(), Some(price("9.99")));
        assert_eq!(book.best_ask(), Some(price("10.01")));
        assert_eq!(book.level_count(Side::Bid), 2);
        assert_eq!(book.order_count(), 4);
        assert!(book.check_invariants().is_ok());
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "9.98", 10, 1)).unwrap();
        let before = book.snapshot();
        assert_eq!(book.cancel_order(OrderId(42)), Ok(false));
        assert_eq!(book.snapshot(), before);
    }

    #[test]
    fn test_cancel_removes_level_and_index() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "9.98", 10, 1)).unwrap();
        assert_eq!(book.cancel_order(OrderId(1)), Ok(true));
        assert_eq!(book.cancel_order(OrderId(1)), Ok(false));
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.level_count(Side::Bid), 0);
        assert!(book.order(OrderId(1)).is_none());
    }

    #[test]
    fn test_add_rejections() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "9.98", 10, 1)).unwrap();
        assert_eq!(
            book.add_order(limit(1, Side::Bid, "9.97", 10, 2)),
            Err(BookError::DuplicateOrderId(OrderId(1)))
        );
        assert_eq!(
            book.add_order(limit(2, Side::Bid, "9.97", 0, 3)),
            Err(BookError::ZeroQuantity { id: OrderId(2) })
        );
        assert_eq!(
            book.add_order(Order::market(OrderId(3), Side::Ask, 5, 4)),
            Err(BookError::NotRestable { id: OrderId(3) })
        );
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.level_count(Side::Bid), 1);
    }

    #[test]
    fn test_matchable_respects_limit_and_priority() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Ask, "10.00", 5, 1)).unwrap();
        book.add_order(limit(2, Side::Ask, "10.01", 5, 2)).unwrap();
        book.add_order(limit(3, Side::Ask, "10.00", 5, 3)).unwrap();
        book.add_order(limit(4, Side::Ask, "10.05", 5, 4)).unwrap();

        let ids = |orders: Vec<Order>| orders.iter().map(|o| o.id.0).collect::<Vec<_>>();
        assert_eq!(ids(book.matchable(Side::Bid, Some(price("10.01")), 100)), vec![1, 3, 2]);
        assert_eq!(ids(book.matchable(Side::Bid, Some(price("10.01")), 6)), vec![1, 3]);
        assert_eq!(ids(book.matchable(Side::Bid, None, 100)), vec![1, 3, 2, 4]);
        assert!(book.matchable(Side::Bid, Some(price("9.99")), 100).is_empty());
        assert!(book.matchable(Side::Ask, None, 100).is_empty());
    }

    #[test]
    fn test_fill_front_partial_then_full() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "10.00", 100, 1)).unwrap();
        book.add_order(limit(2, Side::Bid, "10.00", 50, 2)).unwrap();

        let fill = book.fill_front(Side::Bid, 120).unwrap();
        assert_eq!((fill.maker_id, fill.quantity, fill.maker_remaining), (OrderId(1), 100, 0));
        assert!(book.order(OrderId(1)).is_none());

        let fill = book.fill_front(Side::Bid, 20).unwrap();
        assert_eq!((fill.maker_id, fill.quantity, fill.maker_remaining), (OrderId(2), 20, 30));
        assert_eq!(book.order(OrderId(2)).map(Order::remaining), Some(30));
        assert!(book.check_invariants().is_ok());

        assert_eq!(book.fill_front(Side::Ask, 1), Err(BookError::EmptySide(Side::Ask)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut book = OrderedMapBook::new(16);
        book.add_order(limit(1, Side::Bid, "10.00", 100, 1)).unwrap();
        let copy = book.clone_box();
        book.cancel_order(OrderId(1)).unwrap();
        assert_eq!(copy.order_count(), 1);
        assert_eq!(copy.best_bid(), Some(price("10.00")));
        assert_eq!(book.order_count(), 0);
    }
}
