// ============================================================================
// Engine Module
// Contains the core matching engine business logic
// ============================================================================

mod matching_engine;
mod price_time;
mod shutdown;

pub mod factory;

pub use factory::{build_core, CoreBuilder, TradingCore};
pub use matching_engine::{
    EngineHandle, EngineReport, EngineState, EngineStatus, MatchingEngine, StepOutcome,
};
pub use price_time::PriceTimePriority;
pub use shutdown::StopSignal;
