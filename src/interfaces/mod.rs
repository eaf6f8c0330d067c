// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod event_handler;
mod exporter;
mod matching_algorithm;
mod order_book;
mod quote_sink;
mod shared_book;

pub use event_handler::{
    EngineEvent, EventHandler, LoggingEventHandler, NoOpEventHandler, RecordingEventHandler,
};
pub use exporter::MetricsExporter;
pub use matching_algorithm::MatchingAlgorithm;
pub use order_book::{Fill, OrderBook};
pub use quote_sink::{ChannelSink, QuoteSink};
pub use shared_book::SharedOrderBook;
