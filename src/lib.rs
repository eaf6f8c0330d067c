// ============================================================================
// Order Book Core Library
// Single-writer price-time matching with pluggable book structures and
// reader synchronization strategies
// ============================================================================

//! # Book Core
//!
//! The concurrent heart of a limit order book: one engine thread applies
//! orders and matches them by price-time priority while any number of reader
//! threads query best prices and snapshots.
//!
//! ## Features
//!
//! - **Three book variants** sharing one matching algorithm: ordered map,
//!   skip list, bucketed array
//! - **Three sync strategies** chosen independently of the variant: coarse
//!   lock, read-copy-update, versioned snapshots with bounded staleness
//! - **Bounded channels** in and out of the engine with explicit backpressure
//! - **Lock-free metrics** per thread with percentile reports
//!
//! ## Example
//!
//! ```rust
//! use book_core::prelude::*;
//!
//! let TradingCore { book, orders, trade_receivers, mut engine, .. } =
//!     CoreBuilder::new().skip_list().rcu().build().unwrap();
//!
//! let bid = Order::limit(OrderId(1), Side::Bid, "10.00".parse().unwrap(), 100, 1);
//! let ask = Order::limit(OrderId(2), Side::Ask, "10.00".parse().unwrap(), 40, 2);
//! orders.try_enqueue(bid.into()).unwrap();
//! orders.try_enqueue(ask.into()).unwrap();
//! while engine.step().unwrap() == StepOutcome::Processed {}
//!
//! let trade = trade_receivers[0].try_dequeue().unwrap();
//! assert_eq!(trade.quantity, 40);
//! assert_eq!(book.snapshot().total_bid_quantity(), 60);
//! ```

pub mod book;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod metrics;
pub mod numeric;
pub mod queue;
pub mod readers;
pub mod sync;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::book::create_book;
    pub use crate::clock::Clock;
    pub use crate::domain::{
        BackpressurePolicy, BookConfig, BookVariant, CoreConfig, Execution, ExecutionOutcome,
        Order, OrderBookSnapshot, OrderCommand, OrderId, OrderType, Quote, ShutdownPolicy, Side,
        SyncStrategy, TopOfBook, Trade,
    };
    pub use crate::engine::{
        build_core, CoreBuilder, EngineReport, EngineState, MatchingEngine, PriceTimePriority,
        StepOutcome, StopSignal, TradingCore,
    };
    pub use crate::error::{BookError, ConfigError, EngineError, SyncError};
    pub use crate::interfaces::{
        EngineEvent, EventHandler, LoggingEventHandler, MatchingAlgorithm, NoOpEventHandler,
        OrderBook, QuoteSink, SharedOrderBook,
    };
    pub use crate::metrics::{MetricsCollector, MetricsReport};
    pub use crate::numeric::{Price, Quantity};
    pub use crate::readers::{BookMonitor, MarketDataPublisher};
    pub use crate::sync::wrap_with_sync;
}
