// ============================================================================
// Core Factory
// Assembles book, sync wrapper, channels, engine and metrics from config
// ============================================================================

use crate::book::create_book;
use crate::clock::Clock;
use crate::domain::{
    BackpressurePolicy, BookVariant, CoreConfig, MetricsConfig, ShutdownPolicy, SyncStrategy,
};
use crate::engine::{MatchingEngine, PriceTimePriority};
use crate::error::ConfigError;
use crate::interfaces::{EventHandler, MatchingAlgorithm, NoOpEventHandler, SharedOrderBook};
use crate::metrics::MetricsCollector;
use crate::numeric::Price;
use crate::queue::{order_channel, trade_channel, OrderSender, TradeReceiver};
use crate::sync::wrap_with_algorithm;
use std::sync::Arc;

/// Everything a running core is made of. Move the engine onto its thread,
/// hand `orders` to the admission side and the receivers to consumers.
pub struct TradingCore {
    pub book: Arc<dyn SharedOrderBook>,
    pub orders: OrderSender,
    pub trade_receivers: Vec<TradeReceiver>,
    pub engine: MatchingEngine,
    pub metrics: Arc<MetricsCollector>,
    pub config: CoreConfig,
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Build a core from configuration with the price-time algorithm and no
/// event handler.
///
/// # Example
/// ```
/// use book_core::domain::CoreConfig;
/// use book_core::engine::build_core;
///
/// let core = build_core(CoreConfig::read_heavy()).unwrap();
/// assert_eq!(core.book.variant(), "skip-list");
/// assert_eq!(core.trade_receivers.len(), 1);
/// ```
pub fn build_core(config: CoreConfig) -> Result<TradingCore, ConfigError> {
    CoreBuilder::from_config(config).build()
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for assembling a core with a fluent API.
///
/// # Example
/// ```
/// use book_core::engine::CoreBuilder;
///
/// let core = CoreBuilder::new()
///     .skip_list()
///     .versioned_snapshot(16)
///     .with_trade_consumers(2)
///     .build()
///     .unwrap();
/// assert_eq!(core.book.strategy().name(), "versioned-snapshot");
/// assert_eq!(core.trade_receivers.len(), 2);
/// ```
pub struct CoreBuilder {
    config: CoreConfig,
    handler: Arc<dyn EventHandler>,
    algorithm: Box<dyn MatchingAlgorithm>,
    clock: Option<Clock>,
}

impl CoreBuilder {
    /// Ordered map under a coarse lock
    pub fn new() -> Self {
        Self::from_config(CoreConfig::new(BookVariant::OrderedMap, SyncStrategy::CoarseLock))
    }

    pub fn from_config(config: CoreConfig) -> Self {
        Self {
            config,
            handler: Arc::new(NoOpEventHandler),
            algorithm: Box::new(PriceTimePriority::new()),
            clock: None,
        }
    }

    // ========================================================================
    // Book Variant
    // ========================================================================

    pub fn ordered_map(mut self) -> Self {
        self.config.book.variant = BookVariant::OrderedMap;
        self
    }

    pub fn skip_list(mut self) -> Self {
        self.config.book.variant = BookVariant::SkipList;
        self
    }

    pub fn bucketed_array(mut self, min_price: Price, max_price: Price, tick: Price) -> Self {
        self.config.book.variant = BookVariant::BucketedArray {
            min_price,
            max_price,
            tick,
        };
        self
    }

    pub fn with_expected_orders(mut self, expected_orders: usize) -> Self {
        self.config.book.expected_orders = expected_orders;
        self
    }

    // ========================================================================
    // Sync Strategy
    // ========================================================================

    pub fn coarse_lock(mut self) -> Self {
        self.config.sync = SyncStrategy::CoarseLock;
        self
    }

    pub fn rcu(mut self) -> Self {
        self.config.sync = SyncStrategy::Rcu;
        self
    }

    pub fn versioned_snapshot(mut self, max_lag: u64) -> Self {
        self.config.sync = SyncStrategy::VersionedSnapshot { max_lag };
        self
    }

    // ========================================================================
    // Additional Configuration
    // ========================================================================

    pub fn with_queues(mut self, input_capacity: usize, output_capacity: usize) -> Self {
        self.config = self.config.with_queues(input_capacity, output_capacity);
        self
    }

    pub fn with_trade_consumers(mut self, consumers: usize) -> Self {
        self.config = self.config.with_trade_consumers(consumers);
        self
    }

    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.config = self.config.with_backpressure(policy);
        self
    }

    pub fn with_shutdown(mut self, policy: ShutdownPolicy) -> Self {
        self.config = self.config.with_shutdown(policy);
        self
    }

    pub fn with_engine_core(mut self, core: usize) -> Self {
        self.config = self.config.with_engine_core(core);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.config = self.config.with_metrics(metrics);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Use an already calibrated clock instead of the portable one.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    pub fn build(self) -> Result<TradingCore, ConfigError> {
        let config = self.config;
        config.validate()?;

        let book = wrap_with_algorithm(create_book(&config.book)?, config.sync, self.algorithm);
        let (orders, order_rx) = order_channel(config.queues.input_capacity);
        let (trades, trade_receivers) = trade_channel(
            config.queues.output_capacity,
            config.queues.trade_consumers,
            config.engine.backpressure,
        );
        let metrics = Arc::new(MetricsCollector::from_config(&config.metrics));

        let mut engine = MatchingEngine::new(Arc::clone(&book), order_rx, trades, self.handler)
            .with_shutdown(config.engine.shutdown)
            .with_engine_core(config.engine.engine_core)
            .with_clock(self.clock.unwrap_or_default());
        match metrics.register("engine") {
            Ok(recorder) => engine = engine.with_metrics(recorder),
            Err(err) => tracing::warn!(%err, "engine runs without metrics"),
        }

        tracing::info!(
            variant = book.variant(),
            strategy = config.sync.name(),
            input_capacity = config.queues.input_capacity,
            trade_consumers = config.queues.trade_consumers,
            "trading core assembled"
        );

        Ok(TradingCore {
            book,
            orders,
            trade_receivers,
            engine,
            metrics,
            config,
        })
    }

    /// Get the configuration without building (for inspection)
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

impl Default for CoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderId, Side};
    use crate::engine::StepOutcome;

    #[test]
    fn test_builder_chain() {
        let builder = CoreBuilder::new()
            .bucketed_array(
                "9.00".parse().unwrap(),
                "11.00".parse().unwrap(),
                "0.01".parse().unwrap(),
            )
            .rcu()
            .with_queues(128, 256)
            .with_shutdown(ShutdownPolicy::Discard);
        assert_eq!(builder.config().sync, SyncStrategy::Rcu);
        assert_eq!(builder.config().queues.output_capacity, 256);

        let core = builder.build().unwrap();
        assert_eq!(core.book.variant(), "bucketed-array");
        assert_eq!(core.orders.capacity(), 128);
        assert_eq!(core.metrics.active(), 1);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let result = build_core(CoreConfig::bounded_staleness(0));
        assert!(matches!(result, Err(ConfigError::ZeroMaxLag)));
    }

    #[test]
    fn test_built_core_matches() {
        let TradingCore {
            orders,
            trade_receivers,
            mut engine,
            metrics,
            ..
        } = build_core(CoreConfig::bounded_staleness(2)).unwrap();

        let ask = Order::limit(OrderId(1), Side::Ask, "10.00".parse().unwrap(), 10, 1);
        let bid = Order::limit(OrderId(2), Side::Bid, "10.00".parse().unwrap(), 4, 2);
        orders.try_enqueue(ask.into()).unwrap();
        orders.try_enqueue(bid.into()).unwrap();
        while engine.step().unwrap() == StepOutcome::Processed {}

        assert_eq!(trade_receivers[0].try_dequeue().map(|t| t.quantity), Some(4));
        // idle step flushed publication
        assert_eq!(engine.book().staleness(), 0);
        assert_eq!(metrics.collect().totals.orders, 2);
    }
}
