// ============================================================================
// Shared Order Book Interface
// What the engine and reader threads see, whatever the sync strategy
// ============================================================================

use crate::domain::{Execution, Order, OrderBookSnapshot, OrderCommand, Side, SyncStrategy, TopOfBook};
use crate::error::SyncError;
use crate::numeric::{Price, Quantity};

/// An order book decorated with a concurrency strategy.
///
/// `execute` is the single write path and must only be called by the engine
/// thread. Every other method is safe from any thread and never observes a
/// partially applied command.
pub trait SharedOrderBook: Send + Sync {
    fn strategy(&self) -> SyncStrategy;

    /// Name of the wrapped book variant
    fn variant(&self) -> &'static str;

    /// Apply one command (insert + match, or cancel) as a single mutation.
    fn execute(&self, command: OrderCommand, timestamp: u64) -> Result<Execution, SyncError>;

    fn best_bid(&self) -> Option<Price>;

    fn best_ask(&self) -> Option<Price>;

    /// Both best prices from the same book state.
    fn top_of_book(&self) -> TopOfBook;

    fn snapshot(&self) -> OrderBookSnapshot;

    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order>;

    /// Number of mutations the writer has applied
    fn version(&self) -> u64;

    /// Version readers currently observe
    fn published_version(&self) -> u64 {
        self.version()
    }

    /// How many mutations readers lag behind the writer.
    fn staleness(&self) -> u64 {
        // writer version first: published only grows, so this never
        // overstates the lag
        let current = self.version();
        current.saturating_sub(self.published_version())
    }

    /// Publish any pending state. Called by the engine when it goes idle.
    fn flush(&self) {}

    /// Refuse every further mutation; readers keep the last good state.
    fn halt(&self, reason: &str);

    fn is_halted(&self) -> bool;

    fn order_count(&self) -> usize;

    fn check_invariants(&self) -> Result<(), SyncError>;
}
