// ============================================================================
// Trade Output Channel
// Bounded fan-out: every consumer receives every trade, in order
// ============================================================================
//
// Each consumer owns its own ring, so a slow consumer only ever loses its
// own copies. The engine never blocks indefinitely: `BlockWithRetry` backs
// off for a bounded number of attempts and then drops like `DropAndCount`.

use crate::domain::{BackpressurePolicy, Trade};
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct Subscriber {
    queue: ArrayQueue<Trade>,
    missed: AtomicU64,
    sender_closed: Arc<AtomicBool>,
}

/// What happened to one published trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Every live consumer has a copy
    Delivered,
    /// At least one consumer's ring stayed full
    Dropped { missed_consumers: usize },
}

/// Producing half, owned by the engine.
pub struct TradeSender {
    subscribers: Vec<Arc<Subscriber>>,
    policy: BackpressurePolicy,
    closed: Arc<AtomicBool>,
    published: u64,
    dropped: u64,
}

/// One consumer's view of the trade stream.
pub struct TradeReceiver {
    subscriber: Arc<Subscriber>,
}

/// Create a fan-out channel with `consumers` receivers of `capacity` each.
pub fn trade_channel(
    capacity: usize,
    consumers: usize,
    policy: BackpressurePolicy,
) -> (TradeSender, Vec<TradeReceiver>) {
    let closed = Arc::new(AtomicBool::new(false));
    let subscribers: Vec<_> = (0..consumers)
        .map(|_| {
            Arc::new(Subscriber {
                queue: ArrayQueue::new(capacity.max(1)),
                missed: AtomicU64::new(0),
                sender_closed: Arc::clone(&closed),
            })
        })
        .collect();
    let receivers = subscribers
        .iter()
        .map(|subscriber| TradeReceiver {
            subscriber: Arc::clone(subscriber),
        })
        .collect();
    (
        TradeSender {
            subscribers,
            policy,
            closed,
            published: 0,
            dropped: 0,
        },
        receivers,
    )
}

impl TradeSender {
    /// Hand `trade` to every live consumer.
    pub fn publish(&mut self, trade: Trade) -> PublishOutcome {
        let mut missed_consumers = 0;
        for subscriber in &self.subscribers {
            // receiver dropped: nobody left to miss the trade
            if Arc::strong_count(subscriber) == 1 {
                continue;
            }
            if !Self::deliver(subscriber, trade, self.policy) {
                subscriber.missed.fetch_add(1, Ordering::Relaxed);
                missed_consumers += 1;
            }
        }
        self.published += 1;
        if missed_consumers == 0 {
            PublishOutcome::Delivered
        } else {
            self.dropped += 1;
            PublishOutcome::Dropped { missed_consumers }
        }
    }

    fn deliver(subscriber: &Subscriber, trade: Trade, policy: BackpressurePolicy) -> bool {
        let mut pending = match subscriber.queue.push(trade) {
            Ok(()) => return true,
            Err(trade) => trade,
        };
        let BackpressurePolicy::BlockWithRetry { max_retries } = policy else {
            return false;
        };
        let backoff = Backoff::new();
        for _ in 0..max_retries {
            backoff.snooze();
            match subscriber.queue.push(pending) {
                Ok(()) => return true,
                Err(trade) => pending = trade,
            }
        }
        false
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Trades passed to `publish`
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Trades that missed at least one consumer
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Consumers whose receiver is still alive
    pub fn active_consumers(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|subscriber| Arc::strong_count(subscriber) > 1)
            .count()
    }
}

impl Drop for TradeSender {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl TradeReceiver {
    #[inline]
    pub fn try_dequeue(&self) -> Option<Trade> {
        self.subscriber.queue.pop()
    }

    /// Pop everything currently queued into `out`; returns how many.
    pub fn drain_into(&self, out: &mut Vec<Trade>) -> usize {
        let before = out.len();
        while let Some(trade) = self.subscriber.queue.pop() {
            out.push(trade);
        }
        out.len() - before
    }

    /// Trades this consumer lost to a full ring
    pub fn missed(&self) -> u64 {
        self.subscriber.missed.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.subscriber.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriber.queue.is_empty()
    }

    /// The engine has released its sender; once empty, no more trades come.
    pub fn is_disconnected(&self) -> bool {
        self.subscriber.sender_closed.load(Ordering::Acquire)
    }
}
