// ============================================================================
// Event Handler Interface
// Defines the contract for observing what the engine did with each command
// ============================================================================

use crate::domain::{OrderId, Side, Trade};
use crate::numeric::{Price, Quantity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the matching engine. Timestamps are clock nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EngineEvent {
    /// Order dequeued and validated
    Accepted {
        order_id: OrderId,
        sequence: u64,
        timestamp: u64,
    },

    /// Order refused without touching the book
    Rejected {
        order_id: OrderId,
        reason: String,
        timestamp: u64,
    },

    /// Trade produced and handed to the output channel
    Matched { trade: Trade },

    /// Limit remainder added to the book
    Rested {
        order_id: OrderId,
        side: Side,
        price: Price,
        remaining: Quantity,
        timestamp: u64,
    },

    /// Incoming order fully filled
    Filled {
        order_id: OrderId,
        timestamp: u64,
    },

    /// Market remainder discarded for lack of interest
    Unfilled {
        order_id: OrderId,
        discarded: Quantity,
        timestamp: u64,
    },

    Cancelled {
        order_id: OrderId,
        timestamp: u64,
    },

    /// Cancel for an id that was not resting
    CancelRejected {
        order_id: OrderId,
        timestamp: u64,
    },

    /// A trade missed at least one consumer whose channel stayed full
    TradeDropped { trade: Trade, missed_consumers: usize },

    /// Writer stopped after a fatal error
    Halted { reason: String, timestamp: u64 },
}

/// Event handler trait for processing matching engine events.
/// Runs on the engine thread, so implementations must be cheap.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: EngineEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<EngineEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: EngineEvent) {}
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: EngineEvent) {
        match &event {
            EngineEvent::Halted { reason, .. } => {
                tracing::error!(%reason, "matching engine halted");
            },
            EngineEvent::TradeDropped {
                trade,
                missed_consumers,
            } => {
                tracing::warn!(
                    taker = %trade.taker_order_id,
                    maker = %trade.maker_order_id,
                    missed_consumers,
                    "trade dropped"
                );
            },
            _ => tracing::debug!("Matching engine event: {:?}", event),
        }
    }
}

/// Keeps every event in memory. Useful in tests and replays.
#[derive(Default)]
pub struct RecordingEventHandler {
    events: parking_lot::Mutex<Vec<EngineEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }
}
