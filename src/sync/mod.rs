// ============================================================================
// Synchronization Module
// Reader/writer strategies wrapped around any book variant
// ============================================================================
//
// Each wrapper owns the book and the matching algorithm and runs a whole
// command (insert and match, or cancel) as one mutation. Readers therefore
// see either the state before a command or the state after it, never the
// crossed book in between.

mod coarse_lock;
mod rcu;
mod versioned;

pub use coarse_lock::CoarseLockBook;
pub use rcu::RcuBook;
pub use versioned::VersionedSnapshotBook;

use crate::domain::SyncStrategy;
use crate::engine::PriceTimePriority;
use crate::interfaces::{MatchingAlgorithm, OrderBook, SharedOrderBook};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Wrap `book` with the price-time algorithm under `strategy`.
pub fn wrap_with_sync(book: Box<dyn OrderBook>, strategy: SyncStrategy) -> Arc<dyn SharedOrderBook> {
    wrap_with_algorithm(book, strategy, Box::new(PriceTimePriority::new()))
}

pub fn wrap_with_algorithm(
    book: Box<dyn OrderBook>,
    strategy: SyncStrategy,
    algorithm: Box<dyn MatchingAlgorithm>,
) -> Arc<dyn SharedOrderBook> {
    tracing::debug!(
        variant = book.variant(),
        strategy = strategy.name(),
        algorithm = algorithm.name(),
        "wrapping order book"
    );
    match strategy {
        SyncStrategy::CoarseLock => Arc::new(CoarseLockBook::new(book, algorithm)),
        SyncStrategy::Rcu => Arc::new(RcuBook::new(book, algorithm)),
        SyncStrategy::VersionedSnapshot { max_lag } => {
            Arc::new(VersionedSnapshotBook::new(book, algorithm, max_lag))
        },
    }
}

/// Latched fatal-error state shared by every wrapper.
#[derive(Default)]
pub(crate) struct HaltLatch {
    halted: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl HaltLatch {
    /// Latch the first reason; later calls keep it.
    pub(crate) fn halt(&self, strategy: SyncStrategy, reason: &str) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            tracing::error!(strategy = strategy.name(), %reason, "order book halted");
            *slot = Some(reason.to_string());
        }
        self.halted.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub(crate) fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }
}
