// ============================================================================
// Numeric Errors
// ============================================================================

use std::fmt;

/// Errors produced by fixed-point construction and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericError {
    /// Result exceeded i64::MAX
    Overflow,
    /// Result below i64::MIN
    Underflow,
    /// More fractional digits than the type can hold
    PrecisionLoss,
    /// Input string or value is malformed
    InvalidInput,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::Overflow => write!(f, "fixed-point overflow"),
            NumericError::Underflow => write!(f, "fixed-point underflow"),
            NumericError::PrecisionLoss => {
                write!(f, "value has more fractional digits than supported")
            },
            NumericError::InvalidInput => write!(f, "malformed decimal value"),
        }
    }
}

impl std::error::Error for NumericError {}

pub type NumericResult<T> = Result<T, NumericError>;
