// ============================================================================
// Queue Module
// Bounded channels around the engine: one producer in, fan-out trades out
// ============================================================================

mod broadcast;
mod spsc;

pub use broadcast::{trade_channel, PublishOutcome, TradeReceiver, TradeSender};
pub use spsc::{order_channel, OrderReceiver, OrderSender};
