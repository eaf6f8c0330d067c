// ============================================================================
// Versioned Snapshot Strategy
// Live book behind a narrow lock, immutable snapshots published lock-free
// ============================================================================
//
// Readers of prices and snapshots only ever touch the last published
// snapshot. The writer publishes whenever the live version has moved
// `max_lag` mutations past the published one, and on `flush` when the engine
// goes idle, so a reader never lags by more than `max_lag`.

use crate::domain::{Execution, Order, OrderBookSnapshot, OrderCommand, Side, SyncStrategy, TopOfBook};
use crate::error::SyncError;
use crate::interfaces::{MatchingAlgorithm, OrderBook, SharedOrderBook};
use crate::numeric::{Price, Quantity};
use crossbeam::epoch::{self, Atomic, Owned};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::HaltLatch;

struct Live {
    book: Box<dyn OrderBook>,
    version: u64,
}

pub struct VersionedSnapshotBook {
    live: Mutex<Live>,
    published: Atomic<OrderBookSnapshot>,
    published_version: AtomicU64,
    version: AtomicU64,
    max_lag: u64,
    algorithm: Box<dyn MatchingAlgorithm>,
    variant: &'static str,
    latch: HaltLatch,
    publications: AtomicU64,
}

impl VersionedSnapshotBook {
    /// `max_lag` of zero is treated as one: publish after every mutation.
    pub fn new(book: Box<dyn OrderBook>, algorithm: Box<dyn MatchingAlgorithm>, max_lag: u64) -> Self {
        let initial = book.snapshot().with_version(0);
        Self {
            variant: book.variant(),
            live: Mutex::new(Live { book, version: 0 }),
            published: Atomic::new(initial),
            published_version: AtomicU64::new(0),
            version: AtomicU64::new(0),
            max_lag: max_lag.max(1),
            algorithm,
            latch: HaltLatch::default(),
            publications: AtomicU64::new(0),
        }
    }

    pub fn max_lag(&self) -> u64 {
        self.max_lag
    }

    /// Number of snapshots published since creation
    pub fn publications(&self) -> u64 {
        self.publications.load(Ordering::Relaxed)
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.latch.reason()
    }

    /// Clone of the latest published snapshot
    pub fn latest(&self) -> OrderBookSnapshot {
        self.with_published(OrderBookSnapshot::clone)
    }

    fn with_published<R>(&self, read: impl FnOnce(&OrderBookSnapshot) -> R) -> R {
        let guard = epoch::pin();
        let shared = self.published.load(Ordering::Acquire, &guard);
        // SAFETY: `published` starts non-null and is only replaced with
        // non-null snapshots; retired ones are reclaimed through the epoch
        // collector after this guard unpins.
        read(unsafe { shared.deref() })
    }

    /// Publish the live state. Caller holds the live lock.
    fn publish(&self, live: &Live) -> Result<(), SyncError> {
        let snapshot = live.book.snapshot().with_version(live.version);
        if let Err(detail) = snapshot.check_consistency() {
            let err = SyncError::PublicationFailed {
                detail: format!("snapshot at version {}: {}", live.version, detail),
            };
            self.latch
                .halt(SyncStrategy::VersionedSnapshot { max_lag: self.max_lag }, &err.to_string());
            return Err(err);
        }

        let guard = epoch::pin();
        let retired = self
            .published
            .swap(Owned::new(snapshot), Ordering::AcqRel, &guard);
        // SAFETY: unreachable after the swap; pinned readers keep it alive.
        unsafe { guard.defer_destroy(retired) };
        self.published_version.store(live.version, Ordering::Release);
        self.publications.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl SharedOrderBook for VersionedSnapshotBook {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::VersionedSnapshot {
            max_lag: self.max_lag,
        }
    }

    fn variant(&self) -> &'static str {
        self.variant
    }

    fn execute(&self, command: OrderCommand, timestamp: u64) -> Result<Execution, SyncError> {
        if self.latch.is_halted() {
            return Err(SyncError::Halted);
        }
        let mut guard = self.live.lock();
        let live = &mut *guard;
        let mut execution = match self.algorithm.execute(live.book.as_mut(), command, timestamp) {
            Ok(execution) => execution,
            Err(err) => {
                if err.is_fatal() {
                    self.latch.halt(self.strategy(), &err.to_string());
                }
                return Err(err.into());
            },
        };

        if execution.mutated() {
            live.version += 1;
            self.version.store(live.version, Ordering::Release);
            let published = self.published_version.load(Ordering::Acquire);
            if live.version - published >= self.max_lag {
                self.publish(live)?;
            }
        }
        execution.version = live.version;
        Ok(execution)
    }

    fn best_bid(&self) -> Option<Price> {
        self.with_published(|snapshot| snapshot.best_bid)
    }

    fn best_ask(&self) -> Option<Price> {
        self.with_published(|snapshot| snapshot.best_ask)
    }

    fn top_of_book(&self) -> TopOfBook {
        self.with_published(OrderBookSnapshot::top_of_book)
    }

    fn snapshot(&self) -> OrderBookSnapshot {
        self.latest()
    }

    /// Needs individual orders, which snapshots do not carry, so this one
    /// read takes the live lock.
    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order> {
        self.live.lock().book.matchable(side, limit, quantity)
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn published_version(&self) -> u64 {
        self.published_version.load(Ordering::Acquire)
    }

    fn flush(&self) {
        if self.latch.is_halted() {
            return;
        }
        let live = self.live.lock();
        if live.version > self.published_version.load(Ordering::Acquire) {
            // a failed publication has already halted the book
            let _ = self.publish(&live);
        }
    }

    fn halt(&self, reason: &str) {
        self.latch.halt(self.strategy(), reason);
    }

    fn is_halted(&self) -> bool {
        self.latch.is_halted()
    }

    fn order_count(&self) -> usize {
        self.live.lock().book.order_count()
    }

    fn check_invariants(&self) -> Result<(), SyncError> {
        Ok(self.live.lock().book.check_invariants()?)
    }
}

impl Drop for VersionedSnapshotBook {
    fn drop(&mut self) {
        // SAFETY: exclusive access, no reader can hold a pinned reference.
        unsafe {
            let guard = epoch::unprotected();
            let current = self
                .published
                .swap(epoch::Shared::null(), Ordering::AcqRel, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}
