//! Shared fixtures for unit tests: a small in-memory VAT resolver with the
//! Slovak and Czech rate tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::currency::Currency;
use crate::error::{PriceError, PriceResult};
use crate::vat::{Classification, VatFact, VatRate, VatResolver};

pub struct TestResolver;

impl TestResolver {
    fn rate_for(classification: &str, country: &str) -> VatRate {
        match (country, classification) {
            ("SVK", "07") | ("SVK", "08") => VatRate::Reduced,
            ("SVK", "0") => VatRate::None,
            ("CZE", "2201") => VatRate::SecondReduced,
            ("CZE", "9704 00 00") | ("CZE", "9705 00 00") => VatRate::Reduced,
            ("CZE", "06") | ("CZE", "07") | ("CZE", "08") => VatRate::None,
            _ => VatRate::Standard,
        }
    }
}

impl VatResolver for TestResolver {
    fn retrieve_vat(
        &self,
        classification: &Classification,
        country_code: &str,
        date: DateTime<Utc>,
    ) -> PriceResult<VatFact> {
        if !matches!(country_code, "SVK" | "CZE") {
            return Err(PriceError::VatLookup(format!(
                "no VAT table for {}",
                country_code
            )));
        }
        Ok(VatFact::new(
            country_code,
            Self::rate_for(classification.code(), country_code),
            classification.clone(),
            date,
        ))
    }

    fn percentage_of(&self, vat: &VatFact) -> PriceResult<Decimal> {
        Ok(match (vat.country_code(), vat.rate()) {
            ("SVK", VatRate::Standard) | ("SVK", VatRate::SecondReduced) => dec!(20),
            ("SVK", VatRate::Reduced) => dec!(10),
            ("CZE", VatRate::Standard) => dec!(21),
            ("CZE", VatRate::Reduced) => dec!(15),
            ("CZE", VatRate::SecondReduced) => dec!(10),
            _ => Decimal::ZERO,
        })
    }
}

pub fn eur() -> Currency {
    Currency::new("EUR", "Euro", Some(2))
}

pub fn svk_vat(classification: &str) -> VatFact {
    vat(classification, "SVK")
}

pub fn vat(classification: &str, country: &str) -> VatFact {
    TestResolver
        .retrieve_vat(&Classification::new(classification), country, Utc::now())
        .unwrap()
}
