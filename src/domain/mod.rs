// ============================================================================
// Domain Models Module
// Orders, trades, snapshots and the startup configuration surface
// ============================================================================

pub mod config;
pub mod execution;
pub mod order;
pub mod snapshot;
pub mod trade;

pub use config::{
    BackpressurePolicy, BookConfig, BookVariant, CoreConfig, EngineConfig, MetricsConfig,
    QueueConfig, ShutdownPolicy, SyncStrategy,
};
pub use execution::{Execution, ExecutionOutcome, TradeBuffer};
pub use order::{Order, OrderCommand, OrderId, OrderType, Side};
pub use snapshot::{LevelSummary, OrderBookSnapshot, Quote, TopOfBook};
pub use trade::Trade;
