//! # Currency
//!
//! The monetary unit a price is expressed in. The only thing the price
//! engine needs from it is the minor-unit scale (number of decimal places).
//!
//! Conversion between currencies is not done here: combining prices in
//! two different currencies fails with [`PriceError::UnitMismatch`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PriceError, PriceResult};

/// Built-in ISO 4217 entries: (code, name, minor unit).
const ISO_CURRENCIES: &[(&str, &str, u32)] = &[
    ("EUR", "Euro", 2),
    ("CZK", "Czech Koruna", 2),
    ("USD", "US Dollar", 2),
    ("GBP", "Pound Sterling", 2),
    ("CHF", "Swiss Franc", 2),
    ("PLN", "Zloty", 2),
    ("HUF", "Forint", 2),
    ("JPY", "Yen", 0),
    ("KWD", "Kuwaiti Dinar", 3),
];

/// A currency (monetary unit).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 alphabetic code, e.g. "EUR".
    code: String,

    /// Display name, e.g. "Euro".
    name: String,

    /// Decimal places of the minor unit. `None` behaves as 0.
    minor_unit: Option<u32>,
}

impl Currency {
    /// Creates a custom currency.
    pub fn new(code: impl Into<String>, name: impl Into<String>, minor_unit: Option<u32>) -> Self {
        Currency {
            code: code.into(),
            name: name.into(),
            minor_unit,
        }
    }

    /// Looks up a currency in the built-in ISO table (case-insensitive).
    ///
    /// ## Example
    /// ```rust
    /// use prices_core::currency::Currency;
    ///
    /// let eur = Currency::get("eur").unwrap();
    /// assert_eq!(eur.code(), "EUR");
    /// assert_eq!(eur.minor_unit_rate(), 2);
    /// assert!(Currency::get("XXX").is_err());
    /// ```
    pub fn get(code: &str) -> PriceResult<Self> {
        let wanted = code.trim().to_uppercase();
        ISO_CURRENCIES
            .iter()
            .find(|(iso, _, _)| *iso == wanted)
            .map(|(iso, name, minor)| Currency::new(*iso, *name, Some(*minor)))
            .ok_or_else(|| PriceError::UnknownCurrency(code.to_string()))
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minor-unit scale, defaulting to 0 when the currency has none.
    #[inline]
    pub fn minor_unit_rate(&self) -> u32 {
        self.minor_unit.unwrap_or(0)
    }

    /// Two currencies are the same unit when their codes match.
    pub fn is(&self, other: &Currency) -> bool {
        self.code == other.code
    }

    /// Fails with `UnitMismatch` unless `other` is the same unit.
    pub(crate) fn ensure_same(&self, other: &Currency) -> PriceResult<()> {
        if self.is(other) {
            Ok(())
        } else {
            Err(PriceError::UnitMismatch {
                expected: self.code.clone(),
                actual: other.code.clone(),
            })
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}
