//! # Positivity Policy
//!
//! An opt-in invariant attached to a [`Price`]: the net value of every
//! VAT-rate group must stay non-negative.
//!
//! ## Check Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  value() / value_of_vat() / value_with_vat() / snapshot()               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute()  (only does work when dirty)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PositivityPolicy::check                                                │
//! │       │                                                                 │
//! │       ├── group own base amount + nested entries by VatRate             │
//! │       ├── sum exact net values per group, round to the minor unit       │
//! │       └── collect EVERY group below zero                                │
//! │                │                                                        │
//! │                ├── none  → Ok(())                                       │
//! │                └── some  → PriceError::NegativePrice { violations }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations never check anything. A price may go negative and come back
//! between two reads without tripping the policy.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use tracing::warn;

use crate::amount::{checked, ROUNDING};
use crate::error::{PriceError, PriceResult, RateDeficit};
use crate::price::Price;
use crate::vat::VatRate;

/// Requires every VAT-rate group of a price to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositivityPolicy;

impl PositivityPolicy {
    pub fn new() -> Self {
        PositivityPolicy
    }

    /// Validates `price`, which must already be computed.
    pub fn check(&self, price: &Price) -> PriceResult<()> {
        let scale = price.unit().minor_unit_rate();

        let violations: Vec<RateDeficit> = rate_groups(price)?
            .into_iter()
            .map(|(rate, sum)| {
                let mut sum = sum.round_dp_with_strategy(scale, ROUNDING);
                sum.rescale(scale);
                RateDeficit { rate, sum }
            })
            .filter(|deficit| deficit.sum < Decimal::ZERO)
            .collect();

        if violations.is_empty() {
            return Ok(());
        }

        warn!(
            currency = %price.unit(),
            groups = violations.len(),
            "Price failed positivity check"
        );
        Err(PriceError::NegativePrice { violations })
    }
}

/// Exact net sums per VAT-rate identity.
///
/// The price's own base amount counts under the price's own rate, followed
/// by every nested entry under its rate, in insertion order.
pub fn rate_groups(price: &Price) -> PriceResult<IndexMap<VatRate, Decimal>> {
    let mut groups: IndexMap<VatRate, Decimal> = IndexMap::new();
    add_to_group(&mut groups, price.vat().rate(), price.base_amount().exact())?;

    for (_, nested) in price.nested_prices() {
        let (net, _) = nested.exact_totals()?;
        add_to_group(&mut groups, nested.vat().rate(), net)?;
    }

    Ok(groups)
}

fn add_to_group(
    groups: &mut IndexMap<VatRate, Decimal>,
    rate: VatRate,
    net: Decimal,
) -> PriceResult<()> {
    let sum = groups.entry(rate).or_insert(Decimal::ZERO);
    *sum = checked(sum.checked_add(net), "add")?;
    Ok(())
}
