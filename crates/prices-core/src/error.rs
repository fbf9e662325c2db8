//! # Error Types
//!
//! Domain-specific error types for prices-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  prices-core errors (this file)                                        │
//! │  ├── NegativePrice        - positivity invariant violated              │
//! │  ├── UnitMismatch         - arithmetic across currencies               │
//! │  ├── DivisionByZero       - decimal arithmetic domain error            │
//! │  ├── Overflow             - result outside the decimal range           │
//! │  └── VatLookup            - resolver failure, passed through           │
//! │                                                                         │
//! │  prices-vat errors (separate crate)                                    │
//! │  └── VatError             - rate table / config failures               │
//! │                                                                         │
//! │  Flow: VatError → PriceError::VatLookup → caller                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. The invariant violation carries EVERY offending rate group
//! 3. Collaborator errors keep their original message

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::vat::VatRate;

// =============================================================================
// Rate Deficit
// =============================================================================

/// One VAT-rate group whose summed net value is below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDeficit {
    /// Rate identity of the group.
    pub rate: VatRate,

    /// Summed net value of the group, at the unit's minor-unit scale.
    pub sum: Decimal,
}

/// Renders the full violation list the way it is shown to users:
/// rate identities first, then their sums in the same order.
struct Violations<'a>(&'a [RateDeficit]);

impl fmt::Display for Violations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates: Vec<String> = self.0.iter().map(|d| d.rate.to_string()).collect();
        let sums: Vec<String> = self.0.iter().map(|d| d.sum.to_string()).collect();
        write!(
            f,
            "The sum of prices with VAT rates {} are defective. The sums of the VATs: {}.",
            rates.join(", "),
            sums.join(", ")
        )
    }
}

// =============================================================================
// Price Error
// =============================================================================

/// Price computation errors.
#[derive(Debug, Error)]
pub enum PriceError {
    /// At least one VAT-rate group sums to a negative net value.
    ///
    /// ## When This Occurs
    /// Only on prices with a positivity policy attached, right after a
    /// read forced a recomputation.
    /// ```text
    /// PositivePrice(10 EUR)
    ///      │ subtract 2, 1, 4, 6
    ///      ▼
    /// value()  ──► compute() ──► STANDARD group = -3.00
    ///      │
    ///      ▼
    /// NegativePrice { violations: [STANDARD: -3.00] }
    /// ```
    #[error("The price is invalid! {}", Violations(.violations))]
    NegativePrice { violations: Vec<RateDeficit> },

    /// Two prices in different currencies were combined.
    #[error("Unit mismatch: expected {expected}, got {actual}")]
    UnitMismatch { expected: String, actual: String },

    /// Currency code is not in the built-in table.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Decimal division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// A result does not fit the decimal range (about ±7.9 × 10^28).
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// The resolver returned a percentage that cannot be used.
    #[error("Invalid VAT percentage {percentage} for rate {rate}")]
    InvalidVatPercentage { rate: VatRate, percentage: Decimal },

    /// VAT resolution failed in the external resolver.
    #[error("VAT lookup failed: {0}")]
    VatLookup(String),

    /// Snapshot serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl PriceError {
    /// Returns the offending rate groups for an invariant violation.
    pub fn violations(&self) -> &[RateDeficit] {
        match self {
            PriceError::NegativePrice { violations } => violations,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for PriceError {
    fn from(err: serde_json::Error) -> Self {
        PriceError::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with PriceError.
pub type PriceResult<T> = Result<T, PriceError>;

// =============================================================================
// Unit Tests
// =============================================================================
