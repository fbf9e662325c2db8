//! # prices-vat: VAT Rate Tables
//!
//! Country VAT tables loaded from TOML, plus [`TableResolver`], the
//! [`prices_core::VatResolver`] implementation that reads them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   vat.toml ──► VatTableConfig ──► TableResolver ──► Price::from_gross   │
//! │   (optional)   defaults + env       VatResolver      Price::apply_vat   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Rate tables, TOML loading and validation
//! - [`resolver`] - `VatResolver` over the tables
//! - [`error`] - Configuration and lookup errors
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use prices_core::{Classification, Currency, Price, VatResolver};
//! use prices_vat::TableResolver;
//! use rust_decimal::Decimal;
//!
//! let resolver = TableResolver::default();
//! let water = resolver
//!     .retrieve_vat(&Classification::new("2201"), "CZE", Utc::now())
//!     .unwrap();
//!
//! let eur = Currency::get("EUR").unwrap();
//! let mut price = Price::from_gross(110, &eur, Some(water), None, &resolver).unwrap();
//! assert_eq!(price.value().unwrap(), Decimal::new(10000, 2));
//! assert_eq!(price.value_of_vat().unwrap(), Decimal::new(1000, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod resolver;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{normalize_code, CountryTable, RateChange, VatTableConfig};
pub use error::{VatError, VatResult};
pub use resolver::TableResolver;
