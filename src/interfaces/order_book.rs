// ============================================================================
// Order Book Interface
// Contract shared by every book variant
// ============================================================================

use crate::domain::{Order, OrderBookSnapshot, OrderId, Side};
use crate::error::BookError;
use crate::numeric::{Price, Quantity};

/// Result of filling the best resting order on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub maker_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    /// Quantity the maker still has resting; zero means it left the book
    pub maker_remaining: Quantity,
    /// The maker exactly as it rested before this fill
    pub before: Order,
}

/// Price-ordered ledger of resting orders with an id index.
///
/// Implementations are single-writer structures: every `&mut self` method is
/// only ever called from the engine thread (or on a private RCU clone).
/// Readers reach a book through a [`SharedOrderBook`](super::SharedOrderBook)
/// wrapper, never directly.
pub trait OrderBook: Send + Sync {
    /// Name of the backing structure, for logs and reports
    fn variant(&self) -> &'static str;

    /// Rest a limit order at the back of its price level.
    fn add_order(&mut self, order: Order) -> Result<(), BookError>;

    /// Remove a resting order. `Ok(false)` when the id is not resting; the
    /// book is left untouched in that case.
    fn cancel_order(&mut self, id: OrderId) -> Result<bool, BookError>;

    fn best_bid(&self) -> Option<Price>;

    fn best_ask(&self) -> Option<Price>;

    /// Resting orders an incoming order on `side` could trade against, in
    /// price-time priority, stopping once `quantity` is covered. `limit` of
    /// `None` means a market order.
    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order>;

    fn snapshot(&self) -> OrderBookSnapshot;

    fn order(&self, id: OrderId) -> Option<&Order>;

    /// Highest-priority resting order on `side`
    fn front(&self, side: Side) -> Option<&Order>;

    /// Fill up to `quantity` of the front order on `side`, removing it (and
    /// its index entry) once exhausted.
    fn fill_front(&mut self, side: Side, quantity: Quantity) -> Result<Fill, BookError>;

    /// Put back a maker taken by `fill_front` earlier in the same command,
    /// at its original queue position and with its pre-fill quantity. Used
    /// to unwind a sweep that failed part way.
    fn restore(&mut self, order: Order) -> Result<(), BookError>;

    fn order_count(&self) -> usize;

    fn level_count(&self, side: Side) -> usize;

    /// Verify that the index and the price levels describe the same orders.
    fn check_invariants(&self) -> Result<(), BookError>;

    /// Deep copy, used by RCU to build the next generation
    fn clone_box(&self) -> Box<dyn OrderBook>;
}

impl Clone for Box<dyn OrderBook> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
