//! # VAT Table Configuration
//!
//! Per-country VAT percentages and classification → rate mappings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRICES_DEFAULT_COUNTRY=CZE                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path argument, or PRICES_VAT_TABLE=/etc/prices/vat.toml            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Built-in SVK and CZE tables                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! default_country = "SVK"
//!
//! [countries.SVK]
//! fallback_rate = "standard"
//!
//! [countries.SVK.rates]
//! standard = "20"
//! reduced = "10"
//! none = "0"
//!
//! [countries.SVK.classifications]
//! "07" = "reduced"
//! "0" = "none"
//!
//! [[countries.SVK.changes]]
//! effective_from = "2025-01-01"
//! rates = { standard = "23", reduced = "19" }
//! ```

use chrono::NaiveDate;
use prices_core::VatRate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{VatError, VatResult};

/// Environment variable pointing at the rate table file.
pub const VAT_TABLE_ENV: &str = "PRICES_VAT_TABLE";

/// Environment variable overriding the default country.
pub const DEFAULT_COUNTRY_ENV: &str = "PRICES_DEFAULT_COUNTRY";

// =============================================================================
// Country Table
// =============================================================================

/// A dated override of some rates of a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateChange {
    /// First day the new percentages apply.
    pub effective_from: NaiveDate,

    /// Rate name → percentage. Rates not listed keep their base value.
    pub rates: BTreeMap<String, Decimal>,
}

/// VAT table of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTable {
    /// Rate name ("standard", "reduced", ...) → percentage (20 = 20 %).
    #[serde(default)]
    pub rates: BTreeMap<String, Decimal>,

    /// Classification code → rate.
    #[serde(default)]
    pub classifications: BTreeMap<String, VatRate>,

    /// Rate used for classifications not listed above.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: VatRate,

    /// Dated rate overrides, any order.
    #[serde(default)]
    pub changes: Vec<RateChange>,
}

fn default_fallback_rate() -> VatRate {
    VatRate::Standard
}

impl CountryTable {
    /// Rate for a classification code.
    pub fn rate_for(&self, classification: &str) -> VatRate {
        self.classifications
            .get(classification)
            .copied()
            .unwrap_or(self.fallback_rate)
    }

    /// Percentage of `rate` on `date`, after applying every change that is
    /// already effective (latest wins).
    pub fn percentage_on(&self, rate: VatRate, date: NaiveDate) -> Option<Decimal> {
        if rate.is_always_zero() {
            return Some(Decimal::ZERO);
        }

        let mut changes: Vec<&RateChange> = self
            .changes
            .iter()
            .filter(|change| change.effective_from <= date)
            .collect();
        changes.sort_by_key(|change| change.effective_from);

        changes
            .iter()
            .rev()
            .find_map(|change| lookup(&change.rates, rate))
            .or_else(|| lookup(&self.rates, rate))
    }
}

/// Finds a rate in a name-keyed map, accepting any spelling `VatRate`
/// parses.
fn lookup(rates: &BTreeMap<String, Decimal>, rate: VatRate) -> Option<Decimal> {
    rates
        .iter()
        .find(|(name, _)| name.parse::<VatRate>().ok() == Some(rate))
        .map(|(_, percentage)| *percentage)
}

// =============================================================================
// Main VAT Table Configuration
// =============================================================================

/// Complete VAT rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatTableConfig {
    /// Country used when the caller does not name one.
    #[serde(default = "default_country")]
    pub default_country: String,

    /// Country code (ISO 3166 alpha-3) → table.
    #[serde(default)]
    pub countries: BTreeMap<String, CountryTable>,
}

fn default_country() -> String {
    "SVK".to_string()
}

impl Default for VatTableConfig {
    /// Slovak and Czech tables.
    fn default() -> Self {
        let svk = CountryTable {
            rates: rates(&[("standard", 20), ("reduced", 10), ("second_reduced", 20), ("none", 0)]),
            classifications: classifications(&[
                ("07", VatRate::Reduced),
                ("08", VatRate::Reduced),
                ("1", VatRate::Standard),
                ("2", VatRate::Standard),
                ("0", VatRate::None),
            ]),
            fallback_rate: VatRate::Standard,
            changes: Vec::new(),
        };

        let cze = CountryTable {
            rates: rates(&[("standard", 21), ("reduced", 15), ("second_reduced", 10), ("none", 0)]),
            classifications: classifications(&[
                ("9705 00 00", VatRate::Reduced),
                ("9704 00 00", VatRate::Reduced),
                ("2201", VatRate::SecondReduced),
                ("06", VatRate::None),
                ("07", VatRate::None),
                ("08", VatRate::None),
                ("09", VatRate::None),
                ("10", VatRate::None),
                ("1", VatRate::Standard),
                ("2", VatRate::Standard),
            ]),
            fallback_rate: VatRate::Standard,
            changes: Vec::new(),
        };

        VatTableConfig {
            default_country: default_country(),
            countries: BTreeMap::from([("SVK".to_string(), svk), ("CZE".to_string(), cze)]),
        }
    }
}

fn rates(entries: &[(&str, i64)]) -> BTreeMap<String, Decimal> {
    entries
        .iter()
        .map(|(name, pct)| (name.to_string(), Decimal::from(*pct)))
        .collect()
}

fn classifications(entries: &[(&str, VatRate)]) -> BTreeMap<String, VatRate> {
    entries
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect()
}

impl VatTableConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`path`, else `PRICES_VAT_TABLE`)
    /// 3. Environment variables
    pub fn load(path: Option<PathBuf>) -> VatResult<Self> {
        let mut config = Self::default();

        if let Some(path) = path.or_else(|| std::env::var(VAT_TABLE_ENV).ok().map(PathBuf::from)) {
            info!(?path, "Loading VAT table from file");
            let contents = std::fs::read_to_string(&path)?;
            config = Self::from_toml_str(&contents)?;
        } else {
            debug!("No VAT table file configured, using built-in tables");
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the built-in tables if load fails.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load VAT table: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document and upper-cases its country codes. Does not
    /// validate.
    pub fn from_toml_str(contents: &str) -> VatResult<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.normalize_country_codes()?;
        Ok(config)
    }

    /// Trims and upper-cases every country code, including the default
    /// country. Two keys that collapse to the same code are rejected.
    pub fn normalize_country_codes(&mut self) -> VatResult<()> {
        let mut countries = BTreeMap::new();
        for (code, table) in std::mem::take(&mut self.countries) {
            let normalized = normalize_code(&code);
            if countries.insert(normalized.clone(), table).is_some() {
                return Err(VatError::InvalidConfig(format!(
                    "country '{}' is defined more than once",
                    normalized
                )));
            }
        }
        self.countries = countries;
        self.default_country = normalize_code(&self.default_country);
        Ok(())
    }

    pub fn to_toml_string(&self) -> VatResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Saves the table to `path`, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> VatResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VatError::ConfigSaveFailed(e.to_string()))?;
        }
        std::fs::write(path, self.to_toml_string()?)
            .map_err(|e| VatError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "VAT table saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> VatResult<()> {
        if !self.countries.contains_key(&self.default_country) {
            return Err(VatError::InvalidConfig(format!(
                "default country '{}' has no table",
                self.default_country
            )));
        }

        for (country, table) in &self.countries {
            if *country != normalize_code(country) {
                return Err(VatError::InvalidConfig(format!(
                    "country code '{}' must be trimmed upper case",
                    country
                )));
            }

            let all_rates = table
                .rates
                .iter()
                .chain(table.changes.iter().flat_map(|change| change.rates.iter()));

            for (name, percentage) in all_rates {
                let rate: VatRate = name.parse().map_err(|_| {
                    VatError::InvalidConfig(format!("{}: unknown rate name '{}'", country, name))
                })?;
                if *percentage < Decimal::ZERO {
                    return Err(VatError::InvalidConfig(format!(
                        "{}: rate {} has negative percentage {}",
                        country, rate, percentage
                    )));
                }
                if rate.is_always_zero() && !percentage.is_zero() {
                    return Err(VatError::InvalidConfig(format!(
                        "{}: rate {} must be 0, got {}",
                        country, rate, percentage
                    )));
                }
            }

            let used = table
                .classifications
                .values()
                .copied()
                .chain(std::iter::once(table.fallback_rate));
            for rate in used {
                if !rate.is_always_zero() && lookup(&table.rates, rate).is_none() {
                    return Err(VatError::InvalidConfig(format!(
                        "{}: rate {} is used but has no percentage",
                        country, rate
                    )));
                }
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(country) = std::env::var(DEFAULT_COUNTRY_ENV) {
            debug!(country = %country, "Overriding default country from environment");
            self.default_country = normalize_code(&country);
        }
    }

    /// Table of a country, case-insensitive.
    pub fn country(&self, country_code: &str) -> Option<&CountryTable> {
        self.countries.get(&normalize_code(country_code))
    }
}

/// Canonical form of a country code: trimmed, upper case.
pub fn normalize_code(country_code: &str) -> String {
    country_code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = VatTableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_country, "SVK");

        let svk = config.country("svk").unwrap();
        assert_eq!(svk.rate_for("07"), VatRate::Reduced);
        assert_eq!(svk.rate_for("unknown"), VatRate::Standard);
        assert_eq!(
            svk.percentage_on(VatRate::Reduced, date(2024, 1, 1)),
            Some(dec!(10))
        );
        assert_eq!(svk.percentage_on(VatRate::ThirdReduced, date(2024, 1, 1)), None);
        assert_eq!(svk.percentage_on(VatRate::Any, date(2024, 1, 1)), Some(dec!(0)));
    }

    #[test]
    fn test_parse_toml_with_changes() {
        let config = VatTableConfig::from_toml_str(
            r#"
            default_country = "SVK"

            [countries.SVK]
            fallback_rate = "standard"

            [countries.SVK.rates]
            standard = "20"
            reduced = "10"
            none = "0"

            [countries.SVK.classifications]
            "07" = "reduced"
            "0" = "none"

            [[countries.SVK.changes]]
            effective_from = "2026-01-01"
            rates = { reduced = "5" }

            [[countries.SVK.changes]]
            effective_from = "2025-01-01"
            rates = { standard = "23", reduced = "19" }
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let svk = config.country("SVK").unwrap();
        assert_eq!(svk.rate_for("0"), VatRate::None);
        assert_eq!(svk.percentage_on(VatRate::Standard, date(2024, 12, 31)), Some(dec!(20)));
        assert_eq!(svk.percentage_on(VatRate::Standard, date(2025, 1, 1)), Some(dec!(23)));
        assert_eq!(svk.percentage_on(VatRate::Reduced, date(2025, 6, 1)), Some(dec!(19)));
        assert_eq!(svk.percentage_on(VatRate::Reduced, date(2026, 6, 1)), Some(dec!(5)));
        assert_eq!(svk.percentage_on(VatRate::Standard, date(2026, 6, 1)), Some(dec!(23)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = VatTableConfig::default();
        config.default_country = "AUT".to_string();
        assert!(matches!(config.validate(), Err(VatError::InvalidConfig(_))));

        let mut config = VatTableConfig::default();
        let svk = config.countries.get_mut("SVK").unwrap();
        svk.rates.insert("reduced".to_string(), dec!(-1));
        assert!(config.validate().is_err());

        let mut config = VatTableConfig::default();
        let svk = config.countries.get_mut("SVK").unwrap();
        svk.rates.insert("none".to_string(), dec!(5));
        assert!(config.validate().is_err());

        let mut config = VatTableConfig::default();
        let svk = config.countries.get_mut("SVK").unwrap();
        svk.classifications.insert("99".to_string(), VatRate::ThirdReduced);
        assert!(config.validate().is_err());

        let mut config = VatTableConfig::default();
        let svk = config.countries.get_mut("SVK").unwrap();
        svk.rates.insert("luxury".to_string(), dec!(30));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_country_codes_are_normalized() {
        let config = VatTableConfig::from_toml_str(
            r#"
            default_country = "svk"

            [countries.svk.rates]
            standard = "20"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_country, "SVK");
        assert!(config.countries.contains_key("SVK"));
        assert!(config.country(" Svk ").is_some());

        let duplicated = VatTableConfig::from_toml_str(
            r#"
            [countries.svk.rates]
            standard = "20"

            [countries.SVK.rates]
            standard = "21"
            "#,
        );
        assert!(matches!(duplicated, Err(VatError::InvalidConfig(_))));

        let mut config = VatTableConfig::default();
        let svk = config.countries.remove("SVK").unwrap();
        config.countries.insert("svk".to_string(), svk);
        config.default_country = "svk".to_string();
        assert!(config.validate().is_err());
        config.normalize_country_codes().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_keeps_tables() {
        let config = VatTableConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("[countries.SVK.rates]"));

        let parsed = VatTableConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file_and_save() {
        let dir = std::env::temp_dir().join(format!("prices-vat-test-{}", std::process::id()));
        let path = dir.join("vat.toml");

        let mut config = VatTableConfig::default();
        config.default_country = "CZE".to_string();
        config.save(&path).unwrap();

        let loaded = VatTableConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.countries, config.countries);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = PathBuf::from("/nonexistent/prices/vat.toml");
        assert!(matches!(
            VatTableConfig::load(Some(path.clone())),
            Err(VatError::ConfigLoadFailed(_))
        ));
        let config = VatTableConfig::load_or_default(Some(path));
        assert!(config.country("CZE").is_some());
    }
}
