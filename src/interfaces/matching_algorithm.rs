// ============================================================================
// Matching Algorithm Interface
// ============================================================================

use crate::domain::{Execution, Order, OrderCommand, Side};
use crate::error::BookError;
use crate::numeric::Price;

use super::OrderBook;

/// Applies a command to a book. One algorithm serves every book variant.
pub trait MatchingAlgorithm: Send + Sync {
    /// Run `command` against `book`, stamping trades with `timestamp`.
    ///
    /// Non-fatal refusals (duplicate id, zero quantity) come back as a
    /// rejected `Execution` with the book untouched; `Err` means the book can
    /// no longer be trusted.
    fn execute(
        &self,
        book: &mut dyn OrderBook,
        command: OrderCommand,
        timestamp: u64,
    ) -> Result<Execution, BookError>;

    /// Get the algorithm name for logging/metrics
    fn name(&self) -> &str;

    /// Whether a resting price is acceptable to the incoming order.
    /// Market orders accept any price.
    fn prices_cross(&self, incoming: &Order, book_price: Price) -> bool {
        if incoming.is_market() {
            return true;
        }
        match incoming.side {
            Side::Bid => incoming.price >= book_price,
            Side::Ask => incoming.price <= book_price,
        }
    }
}
