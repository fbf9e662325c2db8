//! # Price Snapshots
//!
//! A computed, immutable read model of a [`Price`](crate::price::Price)
//! tree, ready to be serialized for receipts, APIs or a frontend.
//!
//! Amounts are decimal strings (`"10.00"`), never floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PriceResult;

/// Computed values of one price, at its currency's minor-unit scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceSnapshot {
    /// ISO 4217 code.
    pub currency: String,

    /// VAT rate identity, e.g. "STANDARD".
    pub rate: String,

    pub country_code: String,
    pub classification: String,

    /// Net value.
    #[ts(as = "String")]
    pub value: Decimal,

    #[ts(as = "String")]
    pub value_of_vat: Decimal,

    /// Gross value.
    #[ts(as = "String")]
    pub value_with_vat: Decimal,

    /// Nested categories in insertion order.
    pub nested: Vec<CategorySnapshot>,
}

/// One nested category of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategorySnapshot {
    pub category: String,
    pub price: PriceSnapshot,
}

impl PriceSnapshot {
    /// Looks up a nested category.
    pub fn category(&self, category: &str) -> Option<&PriceSnapshot> {
        self.nested
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| &entry.price)
    }

    pub fn to_json(&self) -> PriceResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::price::Price;
    use crate::test_support::{eur, svk_vat, TestResolver};
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_tree() {
        let mut order = Price::new(5, &eur());
        order
            .set_nested_price(
                "food",
                Price::from_gross(11, &eur(), Some(svk_vat("07")), None, &TestResolver).unwrap(),
            )
            .unwrap();
        let mut order = order.apply_vat(&TestResolver).unwrap();
        order
            .set_nested_price(
                "tools",
                Price::from_gross(12, &eur(), Some(svk_vat("1")), None, &TestResolver).unwrap(),
            )
            .unwrap();

        // own 5 + food 10 (+1 at 10 %) + tools 10 (+2 at 20 %)
        let snapshot = order.snapshot().unwrap();
        assert_eq!(snapshot.currency, "EUR");
        assert_eq!(snapshot.rate, "ANY");
        assert_eq!(snapshot.value, dec!(25));
        assert_eq!(snapshot.value_of_vat, dec!(3));
        assert_eq!(snapshot.value_with_vat, dec!(28));

        let food = snapshot.category("food").unwrap();
        assert_eq!(food.rate, "REDUCED");
        assert_eq!(food.country_code, "SVK");
        assert_eq!(food.classification, "07");
        assert_eq!(food.value_with_vat, dec!(11));
        assert_eq!(snapshot.category("tools").unwrap().value_of_vat, dec!(2));
        assert!(snapshot.category("drinks").is_none());
    }

    #[test]
    fn test_snapshot_json_uses_decimal_strings() {
        let mut price = Price::new(dec!(1.5), &eur());
        let json = price.snapshot().unwrap().to_json().unwrap();
        assert!(json.contains(r#""value":"1.50""#));
        assert!(json.contains(r#""nested":[]"#));
    }

    #[test]
    fn test_snapshot_fails_like_a_read() {
        let mut price = Price::new(1, &eur()).positive();
        price.subtract_value(2).unwrap();
        assert!(price.snapshot().is_err());
    }
}
