// ============================================================================
// Fixed-Point Decimal
// Integer-backed prices with compile-time precision
// ============================================================================

use super::errors::{NumericError, NumericResult};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-point decimal number stored as `value × 10^DECIMALS` in an i64.
///
/// Prices in the book are compared, hashed and bucketed through the raw
/// integer only; decimal formatting and `rust_decimal` conversions exist for
/// API boundaries. With the `serde` feature a value travels as a decimal
/// (`"10.25"`), never as its raw integer.
///
/// # Example
/// ```
/// use book_core::numeric::Price;
///
/// let price: Price = "10.00".parse().unwrap();
/// assert_eq!(price.raw_value(), 100_000);
/// assert_eq!(price.to_string(), "10.0000");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "rust_decimal::Decimal", into = "rust_decimal::Decimal")
)]
#[repr(transparent)]
pub struct FixedDecimal<const DECIMALS: u8 = 4>(i64);

const fn pow10(n: u8) -> i64 {
    let mut result: i64 = 1;
    let mut i = 0;
    while i < n {
        result *= 10;
        i += 1;
    }
    result
}

impl<const D: u8> FixedDecimal<D> {
    /// The scale factor (10^DECIMALS)
    pub const SCALE: i64 = pow10(D);

    pub const ZERO: Self = Self(0);

    pub const ONE: Self = Self(pow10(D));

    pub const MAX: Self = Self(i64::MAX);

    pub const MIN: Self = Self(i64::MIN);

    // ========================================================================
    // Construction
    // ========================================================================

    /// Wrap an already scaled value.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn from_integer(value: i64) -> NumericResult<Self> {
        value
            .checked_mul(Self::SCALE)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    /// Build from a whole part and a positive fraction expressed in
    /// 10^-DECIMALS units, e.g. `from_parts(10, 2_500)` is 10.25 at 4 decimals.
    #[inline]
    pub fn from_parts(whole: i64, fraction: u64) -> NumericResult<Self> {
        if fraction >= Self::SCALE as u64 {
            return Err(NumericError::InvalidInput);
        }
        let scaled = whole
            .checked_mul(Self::SCALE)
            .ok_or(NumericError::Overflow)?;
        let fraction = fraction as i64;
        let raw = if whole < 0 {
            scaled.checked_sub(fraction)
        } else {
            scaled.checked_add(fraction)
        };
        raw.map(Self).ok_or(NumericError::Overflow)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub const fn raw_value(self) -> i64 {
        self.0
    }

    /// Whole part, truncated toward zero.
    #[inline]
    pub const fn integer_part(self) -> i64 {
        self.0 / Self::SCALE
    }

    #[inline]
    pub const fn fractional_part(self) -> u64 {
        (self.0 % Self::SCALE).unsigned_abs()
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or(if rhs.0 > 0 {
            NumericError::Overflow
        } else {
            NumericError::Underflow
        })
    }

    #[inline]
    pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(if rhs.0 < 0 {
            NumericError::Overflow
        } else {
            NumericError::Underflow
        })
    }

    /// Number of whole `step`s between `self` and `base`, if `self` sits
    /// exactly on the grid `base + n * step` with `n >= 0`.
    #[inline]
    pub fn steps_from(self, base: Self, step: Self) -> Option<u64> {
        if step.0 <= 0 || self.0 < base.0 {
            return None;
        }
        let offset = self.0.checked_sub(base.0)?;
        if offset % step.0 != 0 {
            return None;
        }
        u64::try_from(offset / step.0).ok()
    }
}

impl<const D: u8> PartialOrd for FixedDecimal<D> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const D: u8> Ord for FixedDecimal<D> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const D: u8> Neg for FixedDecimal<D> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

// ============================================================================
// Display and Debug
// ============================================================================

impl<const D: u8> fmt::Debug for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<const D: u8> fmt::Display for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = self.integer_part().unsigned_abs();
        if D == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        write!(
            f,
            "{}{}.{:0>width$}",
            sign,
            whole,
            self.fractional_part(),
            width = D as usize
        )
    }
}

// ============================================================================
// rust_decimal interop (API boundaries only)
// ============================================================================

impl<const D: u8> FixedDecimal<D> {
    /// Convert from `rust_decimal::Decimal`, refusing values that carry more
    /// precision than `DECIMALS`.
    pub fn from_decimal(value: rust_decimal::Decimal) -> NumericResult<Self> {
        use rust_decimal::prelude::ToPrimitive;

        if value.normalize().scale() > D as u32 {
            return Err(NumericError::PrecisionLoss);
        }
        (value * rust_decimal::Decimal::from(Self::SCALE))
            .to_i64()
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    pub fn to_decimal(self) -> rust_decimal::Decimal {
        rust_decimal::Decimal::new(self.0, D as u32)
    }
}

impl<const D: u8> TryFrom<rust_decimal::Decimal> for FixedDecimal<D> {
    type Error = NumericError;

    fn try_from(value: rust_decimal::Decimal) -> NumericResult<Self> {
        Self::from_decimal(value)
    }
}

impl<const D: u8> From<FixedDecimal<D>> for rust_decimal::Decimal {
    fn from(value: FixedDecimal<D>) -> Self {
        value.to_decimal()
    }
}

impl<const D: u8> std::str::FromStr for FixedDecimal<D> {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() {
            return Err(NumericError::InvalidInput);
        }

        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(NumericError::InvalidInput);
        }
        if fraction.len() > D as usize {
            return Err(NumericError::PrecisionLoss);
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(NumericError::InvalidInput);
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| NumericError::Overflow)?
        };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            // right-pad to DECIMALS digits: "5" at 4 decimals is 5000
            let pad = pow10(D - fraction.len() as u8) as u64;
            fraction
                .parse::<u64>()
                .map_err(|_| NumericError::InvalidInput)?
                * pad
        };

        let value = Self::from_parts(whole, fraction)?;
        Ok(if negative { -value } else { value })
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// Book price: four decimal places (1 tick = 0.0001 at the finest grid).
pub type Price = FixedDecimal<4>;

/// Order quantities are whole units.
pub type Quantity = u64;
