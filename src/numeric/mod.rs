// ============================================================================
// Numeric Module
// Fixed-point prices for the book
// ============================================================================
//
// Prices never touch floating point: levels are keyed, ordered and bucketed
// by the raw scaled i64. `rust_decimal` is only used when converting at the
// edges.

mod errors;
mod fixed_decimal;

pub use errors::{NumericError, NumericResult};
pub use fixed_decimal::{FixedDecimal, Price, Quantity};
