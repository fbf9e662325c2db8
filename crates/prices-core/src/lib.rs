//! # prices-core: Value Computation for Prices with VAT
//!
//! This crate is the **heart** of the prices workspace. It splits monetary
//! amounts into net value and VAT, aggregates them over nested categories
//! and, on request, keeps every VAT-rate group non-negative.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Prices Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Application code                             │   │
//! │  │      carts, invoices, order lines, refunds                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ prices-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │  amount   │  │   price   │  │ positivity│  │    vat    │   │   │
//! │  │   │  Amount   │  │   Price   │  │  Policy   │  │  VatFact  │   │   │
//! │  │   │ (decimal) │  │ VatSplit  │  │ RateGroups│  │ Resolver ◄┼───┼── │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO RATE TABLES • SINGLE-THREADED VALUES              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │                 prices-vat (VAT rate tables)                    │   │
//! │  │         TOML config, TableResolver implements VatResolver       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`amount`] - Mutable decimal with a minor-unit scale
//! - [`currency`] - Monetary units
//! - [`vat`] - VAT facts and the resolver contract
//! - [`price`] - The price aggregate
//! - [`positivity`] - Non-negativity per VAT-rate group
//! - [`snapshot`] - Serializable read model
//! - [`error`] - Domain error types
//!
//! ## Ownership
//! A `Price` exclusively owns its amounts and its nested prices. There is
//! no sharing and no locking: to hand a price to someone else, `clone()` it.
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use prices_core::{Classification, Currency, Price, PriceResult, VatFact, VatRate, VatResolver};
//! use rust_decimal::Decimal;
//!
//! struct Reduced10;
//!
//! impl VatResolver for Reduced10 {
//!     fn retrieve_vat(&self, c: &Classification, country: &str, date: DateTime<Utc>) -> PriceResult<VatFact> {
//!         Ok(VatFact::new(country, VatRate::Reduced, c.clone(), date))
//!     }
//!     fn percentage_of(&self, _vat: &VatFact) -> PriceResult<Decimal> {
//!         Ok(Decimal::TEN)
//!     }
//! }
//!
//! let eur = Currency::get("EUR").unwrap();
//! let vat = Reduced10.retrieve_vat(&Classification::new("07"), "SVK", Utc::now()).unwrap();
//!
//! // 11 EUR gross at 10 % = 10 EUR net + 1 EUR VAT
//! let mut price = Price::from_gross(11, &eur, Some(vat), None, &Reduced10).unwrap();
//! assert_eq!(price.value().unwrap(), Decimal::new(1000, 2));
//! assert_eq!(price.value_of_vat().unwrap(), Decimal::new(100, 2));
//! assert_eq!(price.value_with_vat().unwrap(), Decimal::new(1100, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod amount;
pub mod currency;
pub mod error;
pub mod positivity;
pub mod price;
pub mod snapshot;
pub mod vat;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use prices_core::Price` instead of
// `use prices_core::price::Price`

pub use amount::Amount;
pub use currency::Currency;
pub use error::{PriceError, PriceResult, RateDeficit};
pub use positivity::PositivityPolicy;
pub use price::{Price, VatSplit};
pub use snapshot::{CategorySnapshot, PriceSnapshot};
pub use vat::{Classification, VatFact, VatRate, VatResolver};
