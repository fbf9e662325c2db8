//! # Amount Module
//!
//! Provides `Amount`, the mutable decimal value every price owns.
//!
//! ## Precision Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE ROUNDING HAPPENS                                                 │
//! │                                                                         │
//! │  add / subtract / multiply   → exact, never rounded                     │
//! │  divide                      → rounded to scale + extra digits          │
//! │  value(scale)                → rounded to the requested scale           │
//! │                                                                         │
//! │  EUR (scale 2, extra 4): 11.00 × 10 / 110 = 1.000000  → value(2) 1.00   │
//! │                           1.00 × 21 / 121 = 0.173554  → value(2) 0.17   │
//! │                                                                         │
//! │  Repeated add/multiply chains never accumulate cent-level drift         │
//! │  because nothing is cut down to cents until somebody reads it.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use prices_core::amount::Amount;
//! use rust_decimal::Decimal;
//!
//! let mut vat = Amount::new(11, 2);
//! vat.multiply(10)?.divide(110)?;
//! assert_eq!(vat.value(2), Decimal::new(100, 2));
//! # Ok::<(), prices_core::PriceError>(())
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use crate::error::{PriceError, PriceResult};

/// Extra fractional digits kept by `divide` beyond the minor-unit scale.
pub const DEFAULT_EXTRA_PRECISION: u32 = 4;

/// Rounding applied whenever an amount is materialized.
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

// =============================================================================
// Amount Type
// =============================================================================

/// A mutable decimal amount with a minor-unit scale.
///
/// ## Design Decisions
/// - **Owned, never shared**: every price holds its own `Amount`s; copies
///   are made explicitly with `clone()`
/// - **Chaining**: mutators return `PriceResult<&mut Self>` so formulas read
///   left to right with `?`
/// - **Checked**: an operation that leaves the decimal range fails with
///   `Overflow` and leaves the value untouched
/// - **Scale is metadata**: it only matters for `divide` and for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    value: Decimal,
    scale: u32,
    extra: u32,
}

impl Amount {
    /// Creates an amount at the given minor-unit scale with the default
    /// extra precision.
    pub fn new(value: impl Into<Decimal>, scale: u32) -> Self {
        Self::with_precision(value, scale, DEFAULT_EXTRA_PRECISION)
    }

    /// Creates an amount with an explicit number of extra division digits.
    pub fn with_precision(value: impl Into<Decimal>, scale: u32, extra: u32) -> Self {
        Amount {
            value: value.into(),
            scale,
            extra,
        }
    }

    /// Returns a zero amount at the given scale.
    pub fn zero(scale: u32) -> Self {
        Self::new(Decimal::ZERO, scale)
    }

    /// Minor-unit scale (decimal places of the currency).
    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Extra digits retained by `divide`.
    #[inline]
    pub fn extra_precision(&self) -> u32 {
        self.extra
    }

    /// The unrounded value.
    #[inline]
    pub fn exact(&self) -> Decimal {
        self.value
    }

    /// Materializes the value at `scale` decimal places.
    ///
    /// This is the ONLY place where an amount is cut down for reading.
    pub fn value(&self, scale: u32) -> Decimal {
        let mut rounded = self.value.round_dp_with_strategy(scale, ROUNDING);
        rounded.rescale(scale);
        rounded
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn add(&mut self, other: &Amount) -> PriceResult<&mut Self> {
        self.add_value(other.value)
    }

    pub fn add_value(&mut self, value: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.value = checked(self.value.checked_add(value.into()), "add")?;
        Ok(self)
    }

    pub fn subtract(&mut self, other: &Amount) -> PriceResult<&mut Self> {
        self.subtract_value(other.value)
    }

    pub fn subtract_value(&mut self, value: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.value = checked(self.value.checked_sub(value.into()), "subtract")?;
        Ok(self)
    }

    /// Multiplies by `factor`. Exact; negative and zero factors are allowed.
    pub fn multiply(&mut self, factor: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.value = checked(self.value.checked_mul(factor.into()), "multiply")?;
        Ok(self)
    }

    /// Divides by `divisor`, keeping `scale + extra` fractional digits.
    pub fn divide(&mut self, divisor: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.divide_with_offset(divisor, 0)
    }

    /// Divides by `divisor`, keeping `scale + extra + offset` fractional
    /// digits.
    pub fn divide_with_offset(
        &mut self,
        divisor: impl Into<Decimal>,
        offset: u32,
    ) -> PriceResult<&mut Self> {
        let divisor = divisor.into();
        if divisor.is_zero() {
            return Err(PriceError::DivisionByZero);
        }
        let quotient = checked(self.value.checked_div(divisor), "divide")?;
        self.value = quotient.round_dp_with_strategy(self.scale + self.extra + offset, ROUNDING);
        Ok(self)
    }
}

/// Maps a `checked_*` result to `PriceError::Overflow`.
pub(crate) fn checked(result: Option<Decimal>, operation: &'static str) -> PriceResult<Decimal> {
    result.ok_or(PriceError::Overflow { operation })
}

/// Display shows the value at its minor-unit scale.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value(self.scale))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
