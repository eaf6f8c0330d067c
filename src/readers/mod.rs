// ============================================================================
// Readers Module
// Threads that observe the book without ever mutating it
// ============================================================================

mod market_data;
mod monitor;

pub use market_data::MarketDataPublisher;
pub use monitor::BookMonitor;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a reader loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReaderExit {
    /// Its stop signal fired
    Stopped,
    /// Every strong reference to the book was dropped
    BookDropped,
}

/// Summary a reader returns when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReaderReport {
    pub reads: u64,
    /// Quotes handed to the sink (market data only)
    pub published: u64,
    /// Quotes the sink refused (market data only)
    pub sink_rejected: u64,
    /// Consistency violations observed (monitor only)
    pub violations: u64,
    pub last_version: u64,
    pub exit: ReaderExit,
}

impl ReaderReport {
    fn new() -> Self {
        Self {
            reads: 0,
            published: 0,
            sink_rejected: 0,
            violations: 0,
            last_version: 0,
            exit: ReaderExit::Stopped,
        }
    }
}
