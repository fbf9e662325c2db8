//! # Table-backed VAT Resolver
//!
//! [`TableResolver`] answers [`VatResolver`] queries from a validated
//! [`VatTableConfig`].
//!
//! ## Lookup Flow
//! ```text
//! retrieve_vat(classification, "svk", date)
//!      │
//!      ├── country table ("SVK")          ── missing ──► UnknownCountry
//!      │
//!      └── classification → rate          ── unlisted ──► fallback_rate
//!
//! percentage_of(fact)
//!      │
//!      ├── NONE / ANY                     ──► 0
//!      │
//!      └── latest change on or before fact date, else base table
//!                                         ── missing ──► UnknownRate
//! ```

use chrono::{DateTime, Utc};
use prices_core::{Classification, PriceResult, VatFact, VatResolver};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{normalize_code, CountryTable, VatTableConfig};
use crate::error::{VatError, VatResult};

/// Resolves VAT facts and percentages from static country tables.
#[derive(Debug, Clone)]
pub struct TableResolver {
    config: VatTableConfig,
}

impl TableResolver {
    /// Normalizes the country codes of `config`, validates it and wraps it.
    pub fn new(mut config: VatTableConfig) -> VatResult<Self> {
        config.normalize_country_codes()?;
        config.validate()?;
        debug!(
            countries = config.countries.len(),
            default_country = %config.default_country,
            "VAT table resolver ready"
        );
        Ok(TableResolver { config })
    }

    pub fn config(&self) -> &VatTableConfig {
        &self.config
    }

    pub fn default_country(&self) -> &str {
        &self.config.default_country
    }

    /// Resolves a classification in the default country.
    pub fn retrieve_default(
        &self,
        classification: &Classification,
        date: DateTime<Utc>,
    ) -> PriceResult<VatFact> {
        self.retrieve_vat(classification, self.default_country(), date)
    }

    fn table(&self, country_code: &str) -> VatResult<(String, &CountryTable)> {
        match self.config.country(country_code) {
            Some(table) => Ok((normalize_code(country_code), table)),
            None => Err(VatError::UnknownCountry(country_code.to_string())),
        }
    }
}

impl Default for TableResolver {
    /// Resolver over the built-in tables.
    fn default() -> Self {
        TableResolver {
            config: VatTableConfig::default(),
        }
    }
}

impl VatResolver for TableResolver {
    fn retrieve_vat(
        &self,
        classification: &Classification,
        country_code: &str,
        date: DateTime<Utc>,
    ) -> PriceResult<VatFact> {
        let (code, table) = self.table(country_code)?;
        let rate = table.rate_for(classification.code());
        debug!(classification = %classification.code(), country = %code, %rate, "VAT resolved");

        Ok(VatFact::new(code, rate, classification.clone(), date))
    }

    fn percentage_of(&self, vat: &VatFact) -> PriceResult<Decimal> {
        if vat.rate().is_always_zero() {
            return Ok(Decimal::ZERO);
        }

        let (code, table) = self.table(vat.country_code())?;
        let percentage = table
            .percentage_on(vat.rate(), vat.date().date_naive())
            .ok_or_else(|| VatError::UnknownRate {
                country: code,
                rate: vat.rate().to_string(),
            })?;
        Ok(percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateChange;
    use chrono::{NaiveDate, TimeZone};
    use prices_core::{Currency, Price, PriceError, VatRate};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn eur() -> Currency {
        Currency::get("EUR").unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_retrieve_vat_from_tables() {
        let resolver = TableResolver::default();
        let now = Utc::now();

        let water = resolver
            .retrieve_vat(&Classification::new("2201"), "cze", now)
            .unwrap();
        assert_eq!(water.country_code(), "CZE");
        assert_eq!(water.rate(), VatRate::SecondReduced);
        assert_eq!(resolver.percentage_of(&water).unwrap(), dec!(10));

        let vegetables = resolver
            .retrieve_default(&Classification::new("07"), now)
            .unwrap();
        assert_eq!(vegetables.country_code(), "SVK");
        assert_eq!(vegetables.rate(), VatRate::Reduced);

        let other = resolver
            .retrieve_vat(&Classification::new("9999"), "SVK", now)
            .unwrap();
        assert_eq!(other.rate(), VatRate::Standard);
        assert_eq!(resolver.percentage_of(&other).unwrap(), dec!(20));

        let exempt = resolver
            .retrieve_vat(&Classification::new("06"), "CZE", now)
            .unwrap();
        assert_eq!(resolver.percentage_of(&exempt).unwrap(), dec!(0));
    }

    #[test]
    fn test_unknown_country() {
        let resolver = TableResolver::default();
        let err = resolver
            .retrieve_vat(&Classification::new("07"), "AUT", Utc::now())
            .unwrap_err();
        assert!(matches!(err, PriceError::VatLookup(ref msg) if msg.contains("AUT")));
    }

    #[test]
    fn test_unknown_rate() {
        let resolver = TableResolver::default();
        let fact = VatFact::new("SVK", VatRate::ThirdReduced, Classification::any(), Utc::now());
        assert!(matches!(
            resolver.percentage_of(&fact),
            Err(PriceError::VatLookup(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = VatTableConfig::default();
        config.default_country = "XYZ".to_string();
        assert!(matches!(
            TableResolver::new(config),
            Err(VatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_lower_case_country_keys_resolve() {
        let mut config = VatTableConfig::default();
        let cze = config.countries.remove("CZE").unwrap();
        config.countries.insert("cze".to_string(), cze);
        let resolver = TableResolver::new(config).unwrap();

        let water = resolver
            .retrieve_vat(&Classification::new("2201"), "CZE", Utc::now())
            .unwrap();
        assert_eq!(water.country_code(), "CZE");
        assert_eq!(resolver.percentage_of(&water).unwrap(), dec!(10));

        let config = VatTableConfig::from_toml_str(
            r#"
            default_country = "aut"

            [countries.aut.rates]
            standard = "20"
            reduced = "10"

            [countries.aut.classifications]
            "0401" = "reduced"
            "#,
        )
        .unwrap();
        let resolver = TableResolver::new(config).unwrap();
        let milk = resolver
            .retrieve_default(&Classification::new("0401"), Utc::now())
            .unwrap();
        assert_eq!(milk.country_code(), "AUT");
        assert_eq!(resolver.percentage_of(&milk).unwrap(), dec!(10));
    }

    #[test]
    fn test_convert_between_countries() {
        let resolver = TableResolver::default();
        let svk = resolver
            .retrieve_vat(&Classification::new("07"), "SVK", at(2024, 3, 1))
            .unwrap();

        let cze = resolver.convert(&svk, "CZE", None).unwrap();
        assert_eq!(cze.rate(), VatRate::None);
        assert_eq!(cze.date(), svk.date());
        assert_eq!(cze.classification(), svk.classification());
    }

    #[test]
    fn test_dated_rate_change() {
        let mut config = VatTableConfig::default();
        config
            .countries
            .get_mut("SVK")
            .unwrap()
            .changes
            .push(RateChange {
                effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                rates: BTreeMap::from([("standard".to_string(), dec!(23))]),
            });
        let resolver = TableResolver::new(config).unwrap();
        let class = Classification::new("1");

        let before = resolver.retrieve_vat(&class, "SVK", at(2024, 12, 31)).unwrap();
        let after = resolver.retrieve_vat(&class, "SVK", at(2025, 1, 1)).unwrap();
        assert_eq!(resolver.percentage_of(&before).unwrap(), dec!(20));
        assert_eq!(resolver.percentage_of(&after).unwrap(), dec!(23));

        // 123 gross at 23 % = 100 net + 23 VAT
        let mut price = Price::from_gross(123, &eur(), Some(after), None, &resolver).unwrap();
        assert_eq!(price.value().unwrap(), dec!(100));
        assert_eq!(price.value_of_vat().unwrap(), dec!(23));
    }

    #[test]
    fn test_back_calculation_with_tables() {
        let resolver = TableResolver::default();
        let cases = [
            ("2201", "CZE", dec!(110), dec!(100), dec!(10)),
            ("9705 00 00", "CZE", dec!(115), dec!(100), dec!(15)),
            ("1", "CZE", dec!(121), dec!(100), dec!(21)),
            ("07", "CZE", dec!(100), dec!(100), dec!(0)),
            ("07", "SVK", dec!(11), dec!(10), dec!(1)),
            ("1", "SVK", dec!(10), dec!(8.33), dec!(1.67)),
        ];

        for (class, country, gross, net, vat) in cases {
            let fact = resolver
                .retrieve_vat(&Classification::new(class), country, Utc::now())
                .unwrap();
            let mut price = Price::from_gross(gross, &eur(), Some(fact), None, &resolver).unwrap();
            assert_eq!(price.value().unwrap(), net, "{} {}", class, country);
            assert_eq!(price.value_of_vat().unwrap(), vat, "{} {}", class, country);
            assert_eq!(price.value_with_vat().unwrap(), gross, "{} {}", class, country);
        }
    }

    #[test]
    fn test_net_price_charged_with_table_vat() {
        let resolver = TableResolver::default();
        let fact = resolver
            .retrieve_vat(&Classification::new("1"), "SVK", Utc::now())
            .unwrap();

        let mut price = Price::with_vat(100, &eur(), fact);
        price.add_value(200).unwrap();
        let mut price = price.apply_vat(&resolver).unwrap();

        assert_eq!(price.value().unwrap(), dec!(300));
        assert_eq!(price.value_of_vat().unwrap(), dec!(60));
        assert_eq!(price.value_with_vat().unwrap(), dec!(360));
    }
}
