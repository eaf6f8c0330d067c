// ============================================================================
// Metrics Collector
// Pre-allocated per-thread slots, recorded without locks, pulled in batches
// ============================================================================
//
// Every slot sits on its own cache line. A thread claims a slot once and
// from then on only touches that slot: relaxed counter increments and a
// `force_push` into a bounded latency ring. Nothing on the recording path
// allocates, locks or blocks. The reporter drains the rings with `collect`.

use crate::error::MetricsError;
use chrono::{DateTime, Utc};
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::LatencyStats;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Default)]
struct Counters {
    orders: AtomicU64,
    trades: AtomicU64,
    cancels: AtomicU64,
    unknown_cancels: AtomicU64,
    rejected: AtomicU64,
    dropped_trades: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            orders: self.orders.load(Ordering::Relaxed),
            trades: self.trades.load(Ordering::Relaxed),
            cancels: self.cancels.load(Ordering::Relaxed),
            unknown_cancels: self.unknown_cancels.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped_trades: self.dropped_trades.load(Ordering::Relaxed),
        }
    }
}

/// Cumulative counter values at collection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CounterSnapshot {
    pub orders: u64,
    pub trades: u64,
    pub cancels: u64,
    pub unknown_cancels: u64,
    pub rejected: u64,
    pub dropped_trades: u64,
}

impl CounterSnapshot {
    fn accumulate(&mut self, other: &CounterSnapshot) {
        self.orders += other.orders;
        self.trades += other.trades;
        self.cancels += other.cancels;
        self.unknown_cancels += other.unknown_cancels;
        self.rejected += other.rejected;
        self.dropped_trades += other.dropped_trades;
    }
}

struct MetricsSlot {
    claimed: AtomicBool,
    label: Mutex<String>,
    latencies: ArrayQueue<u64>,
    overwritten: AtomicU64,
    counters: Counters,
}

/// Per-thread section of a report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThreadReport {
    pub slot: usize,
    pub label: String,
    pub counters: CounterSnapshot,
    pub latency: LatencyStats,
    /// Samples lost to ring wrap-around over the slot's lifetime
    pub overwritten_samples: u64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub totals: CounterSnapshot,
    /// Latency across every slot's samples since the previous collection
    pub latency: LatencyStats,
    pub threads: Vec<ThreadReport>,
}

pub struct MetricsCollector {
    slots: Box<[CachePadded<MetricsSlot>]>,
    ring_capacity: usize,
}

impl MetricsCollector {
    /// Allocate `slots` slots of `ring_capacity` samples each, up front.
    pub fn new(slots: usize, ring_capacity: usize) -> Self {
        let ring_capacity = ring_capacity.max(1);
        let slots = (0..slots.max(1))
            .map(|_| {
                CachePadded::new(MetricsSlot {
                    claimed: AtomicBool::new(false),
                    label: Mutex::new(String::new()),
                    latencies: ArrayQueue::new(ring_capacity),
                    overwritten: AtomicU64::new(0),
                    counters: Counters::default(),
                })
            })
            .collect();
        Self {
            slots,
            ring_capacity,
        }
    }

    pub fn from_config(config: &crate::domain::MetricsConfig) -> Self {
        Self::new(config.slots, config.ring_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn ring_capacity(&self) -> usize {
        self.ring_capacity
    }

    /// Slots currently claimed
    pub fn active(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.claimed.load(Ordering::Acquire))
            .count()
    }

    /// Claim a free slot for the calling thread.
    pub fn register(self: &Arc<Self>, label: impl Into<String>) -> Result<MetricsRecorder, MetricsError> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot
                .claimed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let label = label.into();
                tracing::debug!(slot = index, %label, "metrics slot claimed");
                *slot.label.lock() = label;
                return Ok(MetricsRecorder {
                    collector: Arc::clone(self),
                    slot: index,
                });
            }
        }
        Err(MetricsError::NoFreeSlot {
            capacity: self.slots.len(),
        })
    }

    /// Drain every latency ring and summarise. Counters are cumulative;
    /// latency covers only samples recorded since the previous call.
    pub fn collect(&self) -> MetricsReport {
        let mut totals = CounterSnapshot::default();
        let mut all_samples = Vec::new();
        let mut threads = Vec::new();

        for (index, slot) in self.slots.iter().enumerate() {
            let claimed = slot.claimed.load(Ordering::Acquire);
            let mut samples = Vec::with_capacity(slot.latencies.len());
            while let Some(sample) = slot.latencies.pop() {
                samples.push(sample);
            }
            let counters = slot.counters.snapshot();
            totals.accumulate(&counters);
            if !claimed && samples.is_empty() && counters == CounterSnapshot::default() {
                continue;
            }

            all_samples.extend_from_slice(&samples);
            threads.push(ThreadReport {
                slot: index,
                label: slot.label.lock().clone(),
                counters,
                latency: LatencyStats::from_samples(&mut samples),
                overwritten_samples: slot.overwritten.load(Ordering::Relaxed),
            });
        }

        MetricsReport {
            generated_at: Utc::now(),
            totals,
            latency: LatencyStats::from_samples(&mut all_samples),
            threads,
        }
    }
}

/// A thread's handle on its claimed slot. Releases the slot on drop.
pub struct MetricsRecorder {
    collector: Arc<MetricsCollector>,
    slot: usize,
}

impl MetricsRecorder {
    #[inline]
    fn slot(&self) -> &MetricsSlot {
        &self.collector.slots[self.slot]
    }

    /// Record one latency sample; the oldest sample is overwritten when the
    /// ring is full.
    #[inline]
    pub fn record_latency(&self, nanos: u64) {
        if self.slot().latencies.force_push(nanos).is_some() {
            self.slot().overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_order(&self) {
        self.slot().counters.orders.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_trades(&self, count: u64) {
        if count > 0 {
            self.slot().counters.trades.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_cancel(&self, known: bool) {
        let counters = &self.slot().counters;
        counters.cancels.fetch_add(1, Ordering::Relaxed);
        if !known {
            counters.unknown_cancels.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.slot().counters.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped_trade(&self) {
        self.slot()
            .counters
            .dropped_trades
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn slot_index(&self) -> usize {
        self.slot
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }
}

impl Drop for MetricsRecorder {
    fn drop(&mut self) {
        self.slot().claimed.store(false, Ordering::Release);
    }
}
