// ============================================================================
// Core Configuration
// Startup-time choice of book structure, sync strategy and channel sizing
// ============================================================================

use crate::error::ConfigError;
use crate::numeric::Price;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on bucket count for the bucketed-array variant (per side).
pub const MAX_BUCKETS: u64 = 1 << 22;

// ============================================================================
// Order Book Variant
// ============================================================================

/// Data structure backing the price ladder. All variants behave identically;
/// they differ in latency and cache profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BookVariant {
    /// Balanced ordered map keyed by price; the reference implementation
    OrderedMap,

    /// Probabilistic skip list ordering prices, levels in a hash map
    SkipList,

    /// Contiguous buckets covering `[min_price, max_price]` on a `tick` grid.
    /// Prices outside the range or off the grid go to an overflow map.
    BucketedArray {
        min_price: Price,
        max_price: Price,
        tick: Price,
    },
}

impl BookVariant {
    pub fn name(&self) -> &'static str {
        match self {
            BookVariant::OrderedMap => "ordered-map",
            BookVariant::SkipList => "skip-list",
            BookVariant::BucketedArray { .. } => "bucketed-array",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BookConfig {
    pub variant: BookVariant,
    /// Initial capacity of the order index
    pub expected_orders: usize,
}

impl BookConfig {
    pub fn new(variant: BookVariant) -> Self {
        Self {
            variant,
            expected_orders: 4_096,
        }
    }

    pub fn with_expected_orders(mut self, expected_orders: usize) -> Self {
        self.expected_orders = expected_orders;
        self
    }

    /// Number of buckets per side for the bucketed variant.
    pub fn bucket_count(&self) -> Option<u64> {
        match self.variant {
            BookVariant::BucketedArray {
                min_price,
                max_price,
                tick,
            } => max_price.steps_from(min_price, tick).map(|steps| steps + 1),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BookVariant::BucketedArray {
            min_price,
            max_price,
            tick,
        } = self.variant
        {
            if !tick.is_positive() {
                return Err(ConfigError::InvalidTick(tick));
            }
            if min_price >= max_price {
                return Err(ConfigError::InvalidBucketRange {
                    min: min_price,
                    max: max_price,
                });
            }
            // max must sit on the grid so the last bucket is a real price
            let buckets = self.bucket_count().ok_or(ConfigError::InvalidBucketRange {
                min: min_price,
                max: max_price,
            })?;
            if buckets > MAX_BUCKETS {
                return Err(ConfigError::TooManyBuckets {
                    buckets,
                    limit: MAX_BUCKETS,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Synchronization Strategy
// ============================================================================

/// How readers are kept safe while the single writer mutates the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SyncStrategy {
    /// One mutex around every operation; linearizable, readers contend with
    /// the writer
    CoarseLock,

    /// Clone-mutate-publish generations; readers never wait, writes cost
    /// O(book size)
    Rcu,

    /// Live book behind a writer-side lock, immutable snapshots published at
    /// most `max_lag` mutations apart
    VersionedSnapshot { max_lag: u64 },
}

impl SyncStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SyncStrategy::CoarseLock => "coarse-lock",
            SyncStrategy::Rcu => "rcu",
            SyncStrategy::VersionedSnapshot { .. } => "versioned-snapshot",
        }
    }
}

// ============================================================================
// Engine Policies
// ============================================================================

/// Behaviour when a trade consumer's channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BackpressurePolicy {
    /// Back off and retry up to `max_retries` times, then drop and count
    BlockWithRetry { max_retries: u32 },
    /// Drop immediately and count
    DropAndCount,
}

/// What happens to queued input once the stop signal is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShutdownPolicy {
    /// Process everything already queued before stopping
    Drain,
    /// Count and discard queued commands
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueueConfig {
    pub input_capacity: usize,
    pub output_capacity: usize,
    /// Number of trade consumers; each receives every trade
    pub trade_consumers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            input_capacity: 65_536,
            output_capacity: 65_536,
            trade_consumers: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsConfig {
    /// Threads that may record concurrently
    pub slots: usize,
    /// Latency samples kept per slot between drains
    pub ring_capacity: usize,
    pub report_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            slots: 8,
            ring_capacity: 1 << 16,
            report_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    pub backpressure: BackpressurePolicy,
    pub shutdown: ShutdownPolicy,
    /// Core to pin the engine thread to (needs the `numa` feature)
    pub engine_core: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backpressure: BackpressurePolicy::BlockWithRetry { max_retries: 64 },
            shutdown: ShutdownPolicy::Drain,
            engine_core: None,
        }
    }
}

// ============================================================================
// Complete Configuration
// ============================================================================

/// Everything chosen at startup. Book variant and sync strategy vary
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoreConfig {
    pub book: BookConfig,
    pub sync: SyncStrategy,
    pub queues: QueueConfig,
    pub metrics: MetricsConfig,
    pub engine: EngineConfig,
}

impl CoreConfig {
    pub fn new(variant: BookVariant, sync: SyncStrategy) -> Self {
        Self {
            book: BookConfig::new(variant),
            sync,
            queues: QueueConfig::default(),
            metrics: MetricsConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    pub fn with_queues(mut self, input_capacity: usize, output_capacity: usize) -> Self {
        self.queues.input_capacity = input_capacity;
        self.queues.output_capacity = output_capacity;
        self
    }

    pub fn with_trade_consumers(mut self, consumers: usize) -> Self {
        self.queues.trade_consumers = consumers;
        self
    }

    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.engine.backpressure = policy;
        self
    }

    pub fn with_shutdown(mut self, policy: ShutdownPolicy) -> Self {
        self.engine.shutdown = policy;
        self
    }

    pub fn with_engine_core(mut self, core: usize) -> Self {
        self.engine.engine_core = Some(core);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.book.validate()?;

        if let SyncStrategy::VersionedSnapshot { max_lag } = self.sync {
            if max_lag == 0 {
                return Err(ConfigError::ZeroMaxLag);
            }
        }
        if self.queues.input_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("input channel capacity"));
        }
        if self.queues.output_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("output channel capacity"));
        }
        if self.queues.trade_consumers == 0 {
            return Err(ConfigError::ZeroCapacity("trade consumer count"));
        }
        if self.metrics.slots == 0 {
            return Err(ConfigError::ZeroCapacity("metrics slot count"));
        }
        if self.metrics.ring_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("metrics ring capacity"));
        }
        Ok(())
    }

    /// Load from JSON.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

impl CoreConfig {
    /// Bucketed array under a coarse lock: cheapest writes when readers are few.
    pub fn low_latency(min_price: Price, max_price: Price, tick: Price) -> Self {
        Self::new(
            BookVariant::BucketedArray {
                min_price,
                max_price,
                tick,
            },
            SyncStrategy::CoarseLock,
        )
        .with_backpressure(BackpressurePolicy::DropAndCount)
    }

    /// Skip list under RCU: readers never wait, for read-dominated workloads.
    pub fn read_heavy() -> Self {
        Self::new(BookVariant::SkipList, SyncStrategy::Rcu)
    }

    /// Ordered map with snapshots published every `max_lag` mutations.
    pub fn bounded_staleness(max_lag: u64) -> Self {
        Self::new(
            BookVariant::OrderedMap,
            SyncStrategy::VersionedSnapshot { max_lag },
        )
    }
}
