// ============================================================================
// Price/Time Priority Matching Algorithm (FIFO)
// The single algorithm shared by every book variant
// ============================================================================

use crate::domain::{Execution, ExecutionOutcome, Order, OrderCommand, Trade, TradeBuffer};
use crate::error::BookError;
use crate::interfaces::{MatchingAlgorithm, OrderBook};

/// Price/Time Priority (FIFO) matching algorithm
///
/// Orders at the same price level are matched in arrival order; better prices
/// always trade first. Each pairing trades `min(taker remaining, maker
/// remaining)` at the maker's price.
///
/// # Example
/// ```text
/// Book:  BID 100 @ 10.00 (seq 1)
///        BID  50 @ 10.00 (seq 2)
///
/// Incoming: ASK 120 @ 10.00
/// Result: 100 against seq 1, then 20 against seq 2 (30 left resting)
/// ```
///
/// Before the first fill the orders the sweep will touch are collected with
/// `matchable` and checked against the index. A failure after that point
/// restores every maker already filled, so an error always leaves the book
/// as it was before the command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTimePriority;

impl PriceTimePriority {
    pub fn new() -> Self {
        Self
    }

    fn match_order(
        &self,
        book: &mut dyn OrderBook,
        mut order: Order,
        timestamp: u64,
    ) -> Result<Execution, BookError> {
        if order.remaining() == 0 {
            return Ok(rejected(BookError::ZeroQuantity { id: order.id }));
        }
        if book.order(order.id).is_some() {
            return Ok(rejected(BookError::DuplicateOrderId(order.id)));
        }

        let limit = order.is_limit().then_some(order.price);
        let plan = book.matchable(order.side, limit, order.remaining());
        verify_plan(book, &plan)?;

        let mut touched = Vec::with_capacity(plan.len());
        match self.sweep(book, &mut order, &plan, &mut touched, timestamp) {
            Ok(execution) => Ok(execution),
            Err(err) => {
                unwind(book, &touched);
                Err(err)
            },
        }
    }

    /// Fill against `plan` and rest any limit remainder. Every maker taken
    /// from the book is recorded in `touched` before anything can fail.
    fn sweep(
        &self,
        book: &mut dyn OrderBook,
        order: &mut Order,
        plan: &[Order],
        touched: &mut Vec<Order>,
        timestamp: u64,
    ) -> Result<Execution, BookError> {
        let opposite = order.side.opposite();
        let mut trades = TradeBuffer::new();
        for maker in plan {
            if order.is_filled() {
                break;
            }
            if !self.prices_cross(order, maker.price) {
                break;
            }
            let fill = book.fill_front(opposite, order.remaining())?;
            touched.push(fill.before);
            if fill.maker_id != maker.id || fill.quantity == 0 {
                return Err(BookError::LevelCorrupted {
                    price: fill.price,
                    detail: format!("expected to fill {} but front was {}", maker.id, fill.maker_id),
                });
            }
            order.fill(fill.quantity);
            trades.push(Trade::new(
                order.id,
                fill.maker_id,
                order.side,
                fill.price,
                fill.quantity,
                timestamp,
            ));
        }

        let outcome = if order.is_filled() {
            ExecutionOutcome::Filled
        } else if order.is_limit() {
            book.add_order(*order)?;
            ExecutionOutcome::Rested {
                remaining: order.remaining(),
            }
        } else {
            ExecutionOutcome::Unfilled {
                discarded: order.remaining(),
            }
        };

        Ok(Execution {
            version: 0,
            trades,
            outcome,
        })
    }
}

impl MatchingAlgorithm for PriceTimePriority {
    fn execute(
        &self,
        book: &mut dyn OrderBook,
        command: OrderCommand,
        timestamp: u64,
    ) -> Result<Execution, BookError> {
        match command {
            OrderCommand::New(order) => self.match_order(book, order, timestamp),
            OrderCommand::Cancel { id, .. } => {
                let outcome = if book.cancel_order(id)? {
                    ExecutionOutcome::Cancelled
                } else {
                    ExecutionOutcome::UnknownOrder
                };
                Ok(Execution::new(outcome))
            },
        }
    }

    fn name(&self) -> &str {
        "Price/Time Priority (FIFO)"
    }
}

/// Put back every maker a failed sweep took, newest first, so the book is
/// left exactly as it was before the command.
fn unwind(book: &mut dyn OrderBook, touched: &[Order]) {
    for maker in touched.iter().rev() {
        if let Err(err) = book.restore(*maker) {
            tracing::error!(maker = %maker.id, %err, "could not restore maker after failed sweep");
        }
    }
}

fn rejected(err: BookError) -> Execution {
    Execution::new(ExecutionOutcome::Rejected {
        reason: err.to_string(),
    })
}

/// Every planned maker must still be indexed exactly as it rests.
fn verify_plan(book: &dyn OrderBook, plan: &[Order]) -> Result<(), BookError> {
    for maker in plan {
        match book.order(maker.id) {
            Some(indexed) if indexed == maker => {},
            Some(indexed) => {
                return Err(BookError::IndexCorrupted {
                    id: maker.id,
                    detail: format!(
                        "indexed at {} with {} left, queued at {} with {} left",
                        indexed.price,
                        indexed.remaining(),
                        maker.price,
                        maker.remaining()
                    ),
                })
            },
            None => {
                return Err(BookError::IndexCorrupted {
                    id: maker.id,
                    detail: "queued order missing from index".into(),
                })
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderedMapBook;
    use crate::domain::{OrderId, Side};
    use crate::numeric::Price;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn limit(id: u64, side: Side, px: &str, qty: u64) -> OrderCommand {
        Order::limit(OrderId(id), side, price(px), qty, id).into()
    }

    #[test]
    fn test_partial_fill_leaves_second_bid_resting() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Bid, "10.00", 100), 0).unwrap();
        algo.execute(&mut book, limit(2, Side::Bid, "10.00", 50), 0).unwrap();

        let exec = algo.execute(&mut book, limit(3, Side::Ask, "10.00", 120), 7).unwrap();
        assert_eq!(exec.outcome, ExecutionOutcome::Filled);
        assert_eq!(exec.trades.len(), 2);
        assert_eq!(exec.trades[0].maker_order_id, OrderId(1));
        assert_eq!(exec.trades[0].quantity, 100);
        assert_eq!(exec.trades[1].maker_order_id, OrderId(2));
        assert_eq!(exec.trades[1].quantity, 20);
        assert!(exec.trades.iter().all(|t| t.timestamp == 7 && t.taker_side == Side::Ask));

        assert_eq!(book.order(OrderId(2)).map(Order::remaining), Some(30));
        assert!(book.order(OrderId(1)).is_none());
        assert!(book.check_invariants().is_ok());
    }

    #[test]
    fn test_trades_at_maker_price() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Ask, "10.00", 10), 0).unwrap();
        let exec = algo.execute(&mut book, limit(2, Side::Bid, "10.50", 10), 0).unwrap();
        assert_eq!(exec.trades[0].price, price("10.00"));
    }

    #[test]
    fn test_limit_stops_at_worse_price_and_rests() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Ask, "10.00", 10), 0).unwrap();
        algo.execute(&mut book, limit(2, Side::Ask, "10.05", 10), 0).unwrap();

        let exec = algo.execute(&mut book, limit(3, Side::Bid, "10.01", 25), 0).unwrap();
        assert_eq!(exec.trades.len(), 1);
        assert_eq!(exec.outcome, ExecutionOutcome::Rested { remaining: 15 });
        assert_eq!(book.best_bid(), Some(price("10.01")));
        assert_eq!(book.best_ask(), Some(price("10.05")));
    }

    #[test]
    fn test_market_order_sweeps_and_discards_remainder() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Ask, "10.00", 10), 0).unwrap();
        algo.execute(&mut book, limit(2, Side::Ask, "12.00", 10), 0).unwrap();

        let market = Order::market(OrderId(3), Side::Bid, 25, 3).into();
        let exec = algo.execute(&mut book, market, 0).unwrap();
        assert_eq!(exec.trades.len(), 2);
        assert_eq!(exec.trades[1].price, price("12.00"));
        assert_eq!(exec.outcome, ExecutionOutcome::Unfilled { discarded: 5 });
        assert_eq!(book.order_count(), 0);
        assert!(book.order(OrderId(3)).is_none());
    }

    #[test]
    fn test_market_into_empty_book() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        let exec = algo
            .execute(&mut book, Order::market(OrderId(1), Side::Ask, 5, 1).into(), 0)
            .unwrap();
        assert_eq!(exec.outcome, ExecutionOutcome::Unfilled { discarded: 5 });
        assert!(!exec.mutated());
    }

    #[test]
    fn test_duplicate_and_zero_are_rejected_without_mutation() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Bid, "9.00", 10), 0).unwrap();
        let before = book.snapshot();

        let dup = algo.execute(&mut book, limit(1, Side::Ask, "8.00", 10), 0).unwrap();
        assert!(matches!(dup.outcome, ExecutionOutcome::Rejected { .. }));
        assert!(dup.trades.is_empty());

        let zero = algo.execute(&mut book, limit(2, Side::Ask, "8.00", 0), 0).unwrap();
        assert!(matches!(zero.outcome, ExecutionOutcome::Rejected { .. }));
        assert_eq!(book.snapshot(), before);
    }

    #[test]
    fn test_cancel_outcomes() {
        let algo = PriceTimePriority::new();
        let mut book = OrderedMapBook::new(16);
        algo.execute(&mut book, limit(1, Side::Bid, "9.00", 10), 0).unwrap();
        let cancel = OrderCommand::Cancel {
            id: OrderId(1),
            sequence: 2,
        };
        assert_eq!(algo.execute(&mut book, cancel, 0).unwrap().outcome, ExecutionOutcome::Cancelled);
        assert_eq!(
            algo.execute(&mut book, cancel, 0).unwrap().outcome,
            ExecutionOutcome::UnknownOrder
        );
    }
}
