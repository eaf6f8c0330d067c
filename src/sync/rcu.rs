// ============================================================================
// Read-Copy-Update Strategy
// Immutable book generations swapped atomically; readers never wait
// ============================================================================
//
// The writer clones the current generation, applies the command to the
// private copy and swaps it in with one atomic store. Retired generations
// are reclaimed through crossbeam's epoch collector once every reader that
// pinned them has unpinned.

use crate::domain::{Execution, Order, OrderBookSnapshot, OrderCommand, Side, SyncStrategy, TopOfBook};
use crate::error::SyncError;
use crate::interfaces::{MatchingAlgorithm, OrderBook, SharedOrderBook};
use crate::numeric::{Price, Quantity};
use crossbeam::epoch::{self, Atomic, Guard, Owned};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::HaltLatch;

struct Generation {
    book: Box<dyn OrderBook>,
    version: u64,
}

pub struct RcuBook {
    current: Atomic<Generation>,
    /// Serializes writers; the engine is the only one, this only guards misuse
    writer: Mutex<()>,
    algorithm: Box<dyn MatchingAlgorithm>,
    variant: &'static str,
    version: AtomicU64,
    latch: HaltLatch,
}

impl RcuBook {
    pub fn new(book: Box<dyn OrderBook>, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        Self {
            variant: book.variant(),
            current: Atomic::new(Generation { book, version: 0 }),
            writer: Mutex::new(()),
            algorithm,
            version: AtomicU64::new(0),
            latch: HaltLatch::default(),
        }
    }

    /// Run `read` against the generation current at the time of the call.
    fn read<R>(&self, read: impl FnOnce(&Generation) -> R) -> R {
        let guard = epoch::pin();
        read(self.load(&guard))
    }

    fn load<'g>(&self, guard: &'g Guard) -> &'g Generation {
        let shared = self.current.load(Ordering::Acquire, guard);
        // SAFETY: `current` is initialised in `new` and only ever replaced by
        // another non-null generation; retired ones are destroyed through the
        // epoch collector, so the reference is valid while `guard` is pinned.
        unsafe { shared.deref() }
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.latch.reason()
    }
}

impl SharedOrderBook for RcuBook {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Rcu
    }

    fn variant(&self) -> &'static str {
        self.variant
    }

    fn execute(&self, command: OrderCommand, timestamp: u64) -> Result<Execution, SyncError> {
        if self.latch.is_halted() {
            return Err(SyncError::Halted);
        }
        let _writer = self.writer.lock();
        let guard = epoch::pin();
        let current = self.load(&guard);

        // unknown cancels leave the book alone, skip the copy
        if let OrderCommand::Cancel { id, .. } = command {
            if current.book.order(id).is_none() {
                let mut execution = Execution::new(crate::domain::ExecutionOutcome::UnknownOrder);
                execution.version = current.version;
                return Ok(execution);
            }
        }

        let mut next = current.book.clone_box();
        if next.order_count() != current.book.order_count() {
            let err = SyncError::PublicationFailed {
                detail: format!(
                    "generation copy holds {} orders, source holds {}",
                    next.order_count(),
                    current.book.order_count()
                ),
            };
            self.latch.halt(SyncStrategy::Rcu, &err.to_string());
            return Err(err);
        }

        let mut execution = match self.algorithm.execute(next.as_mut(), command, timestamp) {
            Ok(execution) => execution,
            Err(err) => {
                // the failed copy is dropped; readers keep the current generation
                if err.is_fatal() {
                    self.latch.halt(SyncStrategy::Rcu, &err.to_string());
                }
                return Err(err.into());
            },
        };

        if !execution.mutated() {
            execution.version = current.version;
            return Ok(execution);
        }

        let version = current.version + 1;
        let retired = self.current.swap(
            Owned::new(Generation { book: next, version }),
            Ordering::AcqRel,
            &guard,
        );
        // SAFETY: `retired` is unreachable through `current` after the swap;
        // readers still holding it pinned an earlier epoch and keep it alive
        // until they unpin.
        unsafe { guard.defer_destroy(retired) };
        self.version.store(version, Ordering::Release);

        execution.version = version;
        Ok(execution)
    }

    fn best_bid(&self) -> Option<Price> {
        self.read(|generation| generation.book.best_bid())
    }

    fn best_ask(&self) -> Option<Price> {
        self.read(|generation| generation.book.best_ask())
    }

    fn top_of_book(&self) -> TopOfBook {
        self.read(|generation| TopOfBook {
            best_bid: generation.book.best_bid(),
            best_ask: generation.book.best_ask(),
            version: generation.version,
        })
    }

    fn snapshot(&self) -> OrderBookSnapshot {
        self.read(|generation| generation.book.snapshot().with_version(generation.version))
    }

    fn matchable(&self, side: Side, limit: Option<Price>, quantity: Quantity) -> Vec<Order> {
        self.read(|generation| generation.book.matchable(side, limit, quantity))
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn halt(&self, reason: &str) {
        self.latch.halt(SyncStrategy::Rcu, reason);
    }

    fn is_halted(&self) -> bool {
        self.latch.is_halted()
    }

    fn order_count(&self) -> usize {
        self.read(|generation| generation.book.order_count())
    }

    fn check_invariants(&self) -> Result<(), SyncError> {
        Ok(self.read(|generation| generation.book.check_invariants())?)
    }
}

impl Drop for RcuBook {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no reader can still be inside `read`, so
        // the last generation can be reclaimed without waiting for an epoch.
        unsafe {
            let guard = epoch::unprotected();
            let current = self.current.swap(epoch::Shared::null(), Ordering::AcqRel, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}
