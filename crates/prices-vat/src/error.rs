//! # VAT Table Error Types
//!
//! Error types for rate table configuration and VAT lookups.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  io::Error / toml::de::Error                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  VatError (this module) ← Adds context and categorization              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PriceError::VatLookup (prices-core) ← message kept as-is              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use prices_core::PriceError;
use thiserror::Error;

/// Result type alias for VAT table operations.
pub type VatResult<T> = Result<T, VatError>;

/// VAT table errors.
#[derive(Debug, Error)]
pub enum VatError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Rate table failed validation.
    #[error("Invalid VAT configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the rate table file.
    #[error("Failed to load VAT configuration: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the rate table.
    #[error("Failed to save VAT configuration: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// No rate table for this country.
    #[error("No VAT table for country '{0}'")]
    UnknownCountry(String),

    /// The country table has no percentage for this rate.
    #[error("Country {country} has no percentage for VAT rate {rate}")]
    UnknownRate { country: String, rate: String },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for VatError {
    fn from(err: std::io::Error) -> Self {
        VatError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for VatError {
    fn from(err: toml::de::Error) -> Self {
        VatError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for VatError {
    fn from(err: toml::ser::Error) -> Self {
        VatError::ConfigSaveFailed(err.to_string())
    }
}

impl From<VatError> for PriceError {
    fn from(err: VatError) -> Self {
        PriceError::VatLookup(err.to_string())
    }
}
