// ============================================================================
// Error Taxonomy
// ============================================================================
//
// Three classes of failure flow through the core:
// - recoverable: unknown cancel ids, full channels (handled where they occur)
// - reported: dropped trades, rejected orders (counted, processing continues)
// - fatal: index/level corruption, failed publication, out-of-order arrival
//
// Fatal errors halt the writer; `is_fatal()` is the single place that decides.

use crate::domain::{OrderId, Side};
use crate::numeric::Price;
use thiserror::Error;

/// Errors raised by an order book variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("order {0} is already resting in the book")]
    DuplicateOrderId(OrderId),

    #[error("order {id} has no remaining quantity")]
    ZeroQuantity { id: OrderId },

    #[error("market order {id} cannot rest in the book")]
    NotRestable { id: OrderId },

    #[error("no resting interest on the {0} side")]
    EmptySide(Side),

    #[error("order index corrupted for {id}: {detail}")]
    IndexCorrupted { id: OrderId, detail: String },

    #[error("price level {price} corrupted: {detail}")]
    LevelCorrupted { price: Price, detail: String },
}

impl BookError {
    /// Whether the book can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BookError::EmptySide(_)
                | BookError::IndexCorrupted { .. }
                | BookError::LevelCorrupted { .. }
        )
    }
}

/// Errors raised by a synchronization wrapper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error("book is halted after a fatal error; mutations are refused")]
    Halted,

    #[error("publication of a new book generation failed: {detail}")]
    PublicationFailed { detail: String },
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Book(err) => err.is_fatal(),
            SyncError::Halted | SyncError::PublicationFailed { .. } => true,
        }
    }
}

/// Errors that stop the matching engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("arrival sequence went backwards: {received} after {previous}")]
    OutOfOrderSequence { previous: u64, received: u64 },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::OutOfOrderSequence { .. } => true,
            EngineError::Sync(err) => err.is_fatal(),
        }
    }
}

/// Invalid startup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bucket range is empty: min {min} must be below max {max}")]
    InvalidBucketRange { min: Price, max: Price },

    #[error("bucket tick must be positive, got {0}")]
    InvalidTick(Price),

    #[error("bucket range needs {buckets} buckets, limit is {limit}")]
    TooManyBuckets { buckets: u64, limit: u64 },

    #[error("{0} must be non-zero")]
    ZeroCapacity(&'static str),

    #[error("versioned snapshot max lag must be at least one mutation")]
    ZeroMaxLag,

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Metrics registration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("all {capacity} metrics slots are claimed")]
    NoFreeSlot { capacity: usize },
}

/// Failures while exporting a metrics report.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("metrics export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics serialization failed: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!BookError::DuplicateOrderId(OrderId(1)).is_fatal());
        assert!(!BookError::NotRestable { id: OrderId(1) }.is_fatal());
        assert!(BookError::IndexCorrupted {
            id: OrderId(1),
            detail: "missing level".into()
        }
        .is_fatal());

        let wrapped: SyncError = BookError::DuplicateOrderId(OrderId(7)).into();
        assert!(!wrapped.is_fatal());
        assert!(SyncError::Halted.is_fatal());

        let engine: EngineError = SyncError::PublicationFailed {
            detail: "clone mismatch".into(),
        }
        .into();
        assert!(engine.is_fatal());
        assert!(EngineError::OutOfOrderSequence {
            previous: 5,
            received: 5
        }
        .is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = EngineError::OutOfOrderSequence {
            previous: 9,
            received: 3,
        };
        assert_eq!(err.to_string(), "arrival sequence went backwards: 3 after 9");
        let err: SyncError = BookError::EmptySide(Side::Ask).into();
        assert_eq!(err.to_string(), "no resting interest on the ASK side");
    }
}
