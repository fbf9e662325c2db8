//! # VAT Facts
//!
//! The VAT side of a price: which rate applies, for which product
//! classification, in which country, from which date.
//!
//! ## Who Owns What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  VatFact            immutable, cloned into every price                  │
//! │  ─────────          country + classification + date + rate identity     │
//! │                                                                         │
//! │  VatResolver        external service (prices-vat: TableResolver)        │
//! │  ───────────        classification + country + date → VatFact           │
//! │                     VatFact → percentage                                │
//! │                                                                         │
//! │  The price engine asks for a percentage ONCE, at construction.          │
//! │  It never caches resolver answers.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rate identity (`VatRate`) is what positivity groups are keyed on, NOT the
//! numeric percentage: a 20% standard rate and a 20% second-reduced rate
//! are different groups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PriceError, PriceResult};

// =============================================================================
// VAT Rate
// =============================================================================

/// Rate identity of a VAT fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatRate {
    Standard,
    Reduced,
    SecondReduced,
    ThirdReduced,
    /// Explicitly exempt (0%).
    None,
    /// No VAT information at all; the default for prices built without one.
    #[default]
    Any,
}

impl VatRate {
    /// Rates that are zero by definition, whatever the country.
    pub fn is_always_zero(&self) -> bool {
        matches!(self, VatRate::None | VatRate::Any)
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VatRate::Standard => write!(f, "STANDARD"),
            VatRate::Reduced => write!(f, "REDUCED"),
            VatRate::SecondReduced => write!(f, "SECOND_REDUCED"),
            VatRate::ThirdReduced => write!(f, "THIRD_REDUCED"),
            VatRate::None => write!(f, "NONE"),
            VatRate::Any => write!(f, "ANY"),
        }
    }
}

impl std::str::FromStr for VatRate {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(VatRate::Standard),
            "reduced" => Ok(VatRate::Reduced),
            "second_reduced" => Ok(VatRate::SecondReduced),
            "third_reduced" => Ok(VatRate::ThirdReduced),
            "none" | "exempt" => Ok(VatRate::None),
            "any" => Ok(VatRate::Any),
            other => Err(PriceError::VatLookup(format!(
                "Unknown VAT rate: '{}'. Valid options: standard, reduced, second_reduced, \
                 third_reduced, none, any",
                other
            ))),
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Product classification code (e.g. a customs tariff heading "2201").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Classification(String);

impl Classification {
    pub fn new(code: impl Into<String>) -> Self {
        Classification(code.into())
    }

    /// The catch-all classification used by prices without VAT.
    pub fn any() -> Self {
        Classification(String::new())
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is(&self, code: &str) -> bool {
        self.0 == code
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// VAT Fact
// =============================================================================

/// A resolved VAT fact. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatFact {
    country_code: String,
    rate: VatRate,
    classification: Classification,
    date: DateTime<Utc>,
}

impl VatFact {
    pub fn new(
        country_code: impl Into<String>,
        rate: VatRate,
        classification: Classification,
        date: DateTime<Utc>,
    ) -> Self {
        VatFact {
            country_code: country_code.into(),
            rate,
            classification,
            date,
        }
    }

    /// "No VAT": no country, `ANY` rate, catch-all classification.
    pub fn none(date: DateTime<Utc>) -> Self {
        Self::new("", VatRate::Any, Classification::any(), date)
    }

    #[inline]
    pub fn rate(&self) -> VatRate {
        self.rate
    }

    #[inline]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    #[inline]
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    #[inline]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

// =============================================================================
// VAT Resolver
// =============================================================================

/// The VAT resolution service.
///
/// Percentages are plain percent values: `20` means 20 %.
pub trait VatResolver {
    /// Resolves the VAT fact for a classification in a country at a date.
    fn retrieve_vat(
        &self,
        classification: &Classification,
        country_code: &str,
        date: DateTime<Utc>,
    ) -> PriceResult<VatFact>;

    /// Returns the percentage of a resolved fact.
    fn percentage_of(&self, vat: &VatFact) -> PriceResult<Decimal>;

    /// Re-resolves the same classification for another country.
    fn convert(
        &self,
        vat: &VatFact,
        country_code: &str,
        date: Option<DateTime<Utc>>,
    ) -> PriceResult<VatFact> {
        self.retrieve_vat(
            vat.classification(),
            country_code,
            date.unwrap_or_else(|| vat.date()),
        )
    }
}

impl<R: VatResolver + ?Sized> VatResolver for &R {
    fn retrieve_vat(
        &self,
        classification: &Classification,
        country_code: &str,
        date: DateTime<Utc>,
    ) -> PriceResult<VatFact> {
        (**self).retrieve_vat(classification, country_code, date)
    }

    fn percentage_of(&self, vat: &VatFact) -> PriceResult<Decimal> {
        (**self).percentage_of(vat)
    }

    fn convert(
        &self,
        vat: &VatFact,
        country_code: &str,
        date: Option<DateTime<Utc>>,
    ) -> PriceResult<VatFact> {
        (**self).convert(vat, country_code, date)
    }
}

/// Asks `resolver` for the percentage of `vat`, rejecting negative answers.
pub(crate) fn checked_percentage<R: VatResolver + ?Sized>(
    resolver: &R,
    vat: &VatFact,
) -> PriceResult<Decimal> {
    let percentage = resolver.percentage_of(vat)?;
    if percentage < Decimal::ZERO {
        return Err(PriceError::InvalidVatPercentage {
            rate: vat.rate(),
            percentage,
        });
    }
    Ok(percentage)
}
