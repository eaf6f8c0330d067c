// ============================================================================
// Utilities Module
// Helper functions for thread placement
// ============================================================================

mod affinity;

pub use affinity::{available_cores, pin_current_thread_to_core, CorePlan};
