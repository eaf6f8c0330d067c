// ============================================================================
// Coarse Lock Strategy
// One mutex around the book; every read and write is linearizable
// ============================================================================

use crate::domain::{Execution, Order, OrderBookSnapshot, OrderCommand, Side, SyncStrategy, TopOfBook};
use crate::error::SyncError;
use crate::interfaces::{MatchingAlgorithm, OrderBook, SharedOrderBook};
use crate::numeric::{Price, Quantity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::HaltLatch;

struct Locked {
    book: Box<dyn OrderBook>,
    version: u64,
}

/// Readers take the same lock as the writer, so they contend with it but
/// always see the latest state.
pub struct CoarseLockBook {
    inner: Mutex<Locked>,
    algorithm: Box<dyn MatchingAlgorithm>,
    variant: &'static str,
    /// Mirror of `Locked::version` for lock-free progress checks
    version: AtomicU64,
    latch: HaltLatch,
}

impl CoarseLockBook {
    pub fn new(book: Box<dyn OrderBook>, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        Self {
            variant: book.variant(),
            inner: Mutex::new(Locked { book, version: 0 }),
            algorithm,
            version: AtomicU64::new(0),
            latch: HaltLatch::default(),
        }
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.latch.reason()
    }
}

impl SharedOrderBook for CoarseLockBook {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::CoarseLock
    }

    fn variant(&self) -> &'static str {
        self.variant
    }

    fn execute(&self, command: OrderCommand, timestamp: u64) -> Result<Execution, SyncError> {
        if self.latch.is_halted() {
            return Err(SyncError::Halted);
        }
        let mut guard = self.inner.lock();
        let locked = &mut *guard;
        match self.algorithm.execute(locked.book.as_mut(), command, timestamp) {
            Ok(mut execution) => {
                if execution.mutated() {
                    locked.version += 1;
                    self.version.store(locked.version, Ordering::Release);
                }
                execution.version = locked.version;
                Ok(execution)
            },
            Err(err) => {
                if err.is_fatal() {
                    self.latch.halt(SyncStrategy::CoarseLock, &err.to_string());
                }
                Err(err.into())
            },
        }
    }

    fn best_bid(&self) -> Option<Price> {
        self.inner.lock().book.best_bid()
    }

    fn best_ask(&self) -> Option<Price> {
        self.inner.lock().book.best_ask()
    }

    fn top_of_book(&self) -> TopOfBook {
        let locked = self.inner.lock();
        TopOfBook {
            best_bid: locked.book.best_bid(),
            best_ask: locked.book.best_ask(),
            version: locked.version,
        }
    }

    fn snapshot(&self) -> OrderBookSnapshot {
        let locked = self.inner.lock();
        locked.book.snapshot().with_version(locked.version)
    }

    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order> {
        self.inner.lock().book.matchable(side, limit, quantity)
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn halt(&self, reason: &str) {
        self.latch.halt(SyncStrategy::CoarseLock, reason);
    }

    fn is_halted(&self) -> bool {
        self.latch.is_halted()
    }

    fn order_count(&self) -> usize {
        self.inner.lock().book.order_count()
    }

    fn check_invariants(&self) -> Result<(), SyncError> {
        Ok(self.inner.lock().book.check_invariants()?)
    }
}
