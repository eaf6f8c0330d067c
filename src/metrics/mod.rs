// ============================================================================
// Metrics Module
// Per-thread latency and throughput recording with periodic export
// ============================================================================

mod collector;
mod percentiles;
mod reporter;

pub use collector::{CounterSnapshot, MetricsCollector, MetricsRecorder, MetricsReport, ThreadReport};
pub use percentiles::{nearest_rank, LatencyStats};
#[cfg(feature = "serde")]
pub use reporter::JsonExporter;
pub use reporter::{spawn_reporter, CsvExporter, TracingExporter};
