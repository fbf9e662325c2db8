//! # Price
//!
//! A monetary aggregate: an own base amount plus named nested prices,
//! recomputed lazily, optionally split into net + VAT and optionally
//! guarded by a positivity policy.
//!
//! ## Composition Instead of Subclasses
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Price                                      │
//! │                                                                         │
//! │   base ─────────┐                                                       │
//! │                 ├──► compute() ──► amount (net)                         │
//! │   nested ───────┘        │                                              │
//! │   "food"  → Price        │                                              │
//! │   "drinks"→ Price        ▼                                              │
//! │                    vat_split: Option<VatSplit>   (VAT-aware variant)    │
//! │                    policy:    Option<Positivity> (checked variant)      │
//! │                                                                         │
//! │   vat_split │ policy │ behaves like                                     │
//! │   ──────────┼────────┼─────────────────────────                         │
//! │   None      │ None   │ plain price                                      │
//! │   Some      │ None   │ price with VAT                                   │
//! │   None      │ Some   │ positive price                                   │
//! │   Some      │ Some   │ positive price with VAT                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lazy Recomputation
//! Every mutator only touches raw state and sets `dirty`. Every reader
//! calls `compute()` first, which is a no-op when nothing changed. Readers
//! therefore take `&mut self` and return `PriceResult`, because the
//! positivity policy runs right after `compute()`.
//!
//! ## Rounding
//! Intermediate values are never rounded to the minor unit (only
//! `Amount::divide` trims, to `scale + 4` digits). At read time:
//! - `value_with_vat()` = exact gross rounded to the minor unit
//! - `value_of_vat()`   = exact VAT rounded to the minor unit
//! - `value()`          = the difference of the two
//!
//! so `value() + value_of_vat() == value_with_vat()` always holds and the
//! gross a price was built from is read back unchanged.
//!
//! ## Usage
//! ```rust
//! use prices_core::{Currency, Price};
//! use rust_decimal::Decimal;
//!
//! let eur = Currency::get("EUR").unwrap();
//! let mut basket = Price::new(0, &eur).positive();
//! basket.set_nested_price("bread", Price::new(3, &eur)).unwrap();
//! basket.set_nested_price("milk", Price::new(2, &eur)).unwrap();
//!
//! assert_eq!(basket.value().unwrap(), Decimal::new(500, 2));
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::amount::{checked, Amount};
use crate::currency::Currency;
use crate::error::PriceResult;
use crate::positivity::PositivityPolicy;
use crate::snapshot::{CategorySnapshot, PriceSnapshot};
use crate::vat::{checked_percentage, VatFact, VatResolver};

// =============================================================================
// VAT Split
// =============================================================================

/// VAT tracking for the VAT-aware variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VatSplit {
    /// VAT aggregated over the own amount and all nested prices.
    vat_amount: Amount,

    /// VAT of the own (non-nested) amount. Scaled by `multiply`, kept
    /// across recomputations.
    initial_vat_amount: Amount,
}

impl VatSplit {
    fn new(vat_amount: Amount) -> Self {
        VatSplit {
            initial_vat_amount: vat_amount.clone(),
            vat_amount,
        }
    }

    fn zero(scale: u32) -> Self {
        Self::new(Amount::zero(scale))
    }

    pub fn vat_amount(&self) -> &Amount {
        &self.vat_amount
    }

    pub fn initial_vat_amount(&self) -> &Amount {
        &self.initial_vat_amount
    }
}

// =============================================================================
// Price
// =============================================================================

/// A price: own amount + nested categories, lazily aggregated.
///
/// `Clone` is a deep copy: amounts, the nested map and every nested price
/// are duplicated, so mutating a clone never affects the original.
#[derive(Debug, Clone)]
pub struct Price {
    /// Own contribution, excluding VAT.
    base: Amount,

    /// Aggregated net value. Valid only while `dirty` is false.
    amount: Amount,

    unit: Currency,
    vat: VatFact,
    time: DateTime<Utc>,

    /// Nested categories in insertion order.
    nested: IndexMap<String, Price>,

    vat_split: Option<VatSplit>,
    policy: Option<PositivityPolicy>,

    dirty: bool,
}

impl Price {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a plain price without VAT information, timestamped now.
    ///
    /// `value` is in major units of `unit` (10 EUR, not 1000 cents).
    pub fn new(value: impl Into<Decimal>, unit: &Currency) -> Self {
        Self::from_amount(Amount::new(value, unit.minor_unit_rate()), unit, None, None)
    }

    /// Creates a plain price carrying a VAT fact. No VAT is split off.
    pub fn with_vat(value: impl Into<Decimal>, unit: &Currency, vat: VatFact) -> Self {
        Self::from_amount(
            Amount::new(value, unit.minor_unit_rate()),
            unit,
            Some(vat),
            None,
        )
    }

    /// Creates a plain price from a pre-built amount.
    ///
    /// VAT defaults to "no VAT" and time defaults to now.
    pub fn from_amount(
        amount: Amount,
        unit: &Currency,
        vat: Option<VatFact>,
        time: Option<DateTime<Utc>>,
    ) -> Self {
        let time = time.unwrap_or_else(Utc::now);
        let vat = vat.unwrap_or_else(|| VatFact::none(time));

        Price {
            amount: amount.clone(),
            base: amount,
            unit: unit.clone(),
            vat,
            time,
            nested: IndexMap::new(),
            vat_split: None,
            policy: None,
            dirty: true,
        }
    }

    /// Creates a VAT-aware price from a GROSS value.
    ///
    /// ## Back-calculation
    /// ```text
    /// vat = gross × p / (100 + p)     (kept at scale + 4 digits)
    /// net = gross − vat
    ///
    /// 11.00 EUR at 10 %  →  vat 1.000000, net 10.000000
    /// ```
    ///
    /// The resolver is asked for the percentage once. Rates that are zero
    /// by definition (`NONE`, `ANY`) do not consult it.
    pub fn from_gross<R: VatResolver + ?Sized>(
        value: impl Into<Decimal>,
        unit: &Currency,
        vat: Option<VatFact>,
        time: Option<DateTime<Utc>>,
        resolver: &R,
    ) -> PriceResult<Self> {
        Self::from_gross_amount(
            Amount::new(value, unit.minor_unit_rate()),
            unit,
            vat,
            time,
            resolver,
        )
    }

    /// Same as [`Price::from_gross`], from a pre-built amount.
    pub fn from_gross_amount<R: VatResolver + ?Sized>(
        mut value: Amount,
        unit: &Currency,
        vat: Option<VatFact>,
        time: Option<DateTime<Utc>>,
        resolver: &R,
    ) -> PriceResult<Self> {
        let time = time.unwrap_or_else(Utc::now);
        let vat = vat.unwrap_or_else(|| VatFact::none(time));

        let percentage = if vat.rate().is_always_zero() {
            Decimal::ZERO
        } else {
            checked_percentage(resolver, &vat)?
        };

        let mut vat_amount = value.clone();
        if percentage.is_zero() {
            vat_amount.multiply(Decimal::ZERO)?;
        } else {
            vat_amount
                .multiply(percentage)?
                .divide(Decimal::ONE_HUNDRED + percentage)?;
        }
        value.subtract(&vat_amount)?;

        let mut price = Self::from_amount(value, unit, Some(vat), Some(time));
        price.vat_split = Some(VatSplit::new(vat_amount));
        Ok(price)
    }

    /// Attaches the positivity policy.
    pub fn positive(self) -> Self {
        self.with_policy(PositivityPolicy::new())
    }

    pub fn with_policy(mut self, policy: PositivityPolicy) -> Self {
        self.policy = Some(policy);
        self.dirty = true;
        self
    }

    /// Turns a plain price into the VAT-aware variant by charging VAT on
    /// top of its net value.
    ///
    /// Unlike the VAT = 0 back-fill of [`Price::set_nested_price`], this
    /// applies the rate: 10 EUR at 10 % becomes 10 net + 1 VAT. The own
    /// base is charged at this price's own rate and every nested price is
    /// converted the same way at ITS own rate, so the category tree and
    /// the VAT-rate groups survive. VAT-aware prices are returned unchanged.
    pub fn apply_vat<R: VatResolver + ?Sized>(self, resolver: &R) -> PriceResult<Self> {
        if self.vat_split.is_some() {
            return Ok(self);
        }

        let Price {
            base,
            unit,
            vat,
            time,
            nested,
            policy,
            ..
        } = self;

        let percentage = if vat.rate().is_always_zero() {
            Decimal::ZERO
        } else {
            checked_percentage(resolver, &vat)?
        };
        let mut vat_amount = base.clone();
        vat_amount
            .multiply(percentage)?
            .divide(Decimal::ONE_HUNDRED)?;

        let mut converted = IndexMap::with_capacity(nested.len());
        for (category, price) in nested {
            converted.insert(category, price.apply_vat(resolver)?);
        }

        Ok(Price {
            amount: base.clone(),
            base,
            unit,
            vat,
            time,
            nested: converted,
            vat_split: Some(VatSplit::new(vat_amount)),
            policy,
            dirty: true,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn unit(&self) -> &Currency {
        &self.unit
    }

    #[inline]
    pub fn vat(&self) -> &VatFact {
        &self.vat
    }

    #[inline]
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    #[inline]
    pub fn is_vat_aware(&self) -> bool {
        self.vat_split.is_some()
    }

    #[inline]
    pub fn is_positive_checked(&self) -> bool {
        self.policy.is_some()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn vat_split(&self) -> Option<&VatSplit> {
        self.vat_split.as_ref()
    }

    /// Own (non-nested) amount.
    pub fn base_amount(&self) -> &Amount {
        &self.base
    }

    pub fn nested_price(&self, category: &str) -> Option<&Price> {
        self.nested.get(category)
    }

    /// Mutable access to a nested price. Marks this price dirty.
    pub fn nested_price_mut(&mut self, category: &str) -> Option<&mut Price> {
        let nested = self.nested.get_mut(category)?;
        self.dirty = true;
        Some(nested)
    }

    pub fn nested_prices(&self) -> impl Iterator<Item = (&str, &Price)> {
        self.nested.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.nested.keys().map(String::as_str)
    }

    #[inline]
    fn scale(&self) -> u32 {
        self.unit.minor_unit_rate()
    }

    // =========================================================================
    // Reads (force compute)
    // =========================================================================

    /// Net value at the unit's minor-unit scale.
    pub fn value(&mut self) -> PriceResult<Decimal> {
        self.compute()?;
        let gross = self.read_gross()?;
        checked(gross.checked_sub(self.read_vat()), "subtract")
    }

    /// VAT value at the unit's minor-unit scale. Zero for plain prices.
    pub fn value_of_vat(&mut self) -> PriceResult<Decimal> {
        self.compute()?;
        Ok(self.read_vat())
    }

    /// Gross value (net + VAT) at the unit's minor-unit scale.
    pub fn value_with_vat(&mut self) -> PriceResult<Decimal> {
        self.compute()?;
        self.read_gross()
    }

    /// Computed read model of this price and all nested prices.
    pub fn snapshot(&mut self) -> PriceResult<PriceSnapshot> {
        self.compute()?;
        self.build_snapshot()
    }

    fn read_vat(&self) -> Decimal {
        match &self.vat_split {
            Some(split) => split.vat_amount.value(self.scale()),
            None => Amount::zero(self.scale()).value(self.scale()),
        }
    }

    fn read_gross(&self) -> PriceResult<Decimal> {
        let mut gross = self.amount.clone();
        if let Some(split) = &self.vat_split {
            gross.add(&split.vat_amount)?;
        }
        Ok(gross.value(self.scale()))
    }

    fn build_snapshot(&self) -> PriceResult<PriceSnapshot> {
        let gross = self.read_gross()?;
        let vat = self.read_vat();
        let nested = self
            .nested
            .iter()
            .map(|(category, price)| {
                Ok(CategorySnapshot {
                    category: category.clone(),
                    price: price.build_snapshot()?,
                })
            })
            .collect::<PriceResult<Vec<_>>>()?;

        Ok(PriceSnapshot {
            currency: self.unit.code().to_string(),
            rate: self.vat.rate().to_string(),
            country_code: self.vat.country_code().to_string(),
            classification: self.vat.classification().code().to_string(),
            value: checked(gross.checked_sub(vat), "subtract")?,
            value_of_vat: vat,
            value_with_vat: gross,
            nested,
        })
    }

    // =========================================================================
    // Mutations (mark dirty)
    // =========================================================================

    /// Adds the other price's net value (and, for VAT-aware prices, its
    /// VAT) to the own amount.
    pub fn add(&mut self, other: &Price) -> PriceResult<()> {
        self.unit.ensure_same(&other.unit)?;
        let (net, vat) = other.exact_totals()?;
        self.shift_own(net, vat)
    }

    /// Subtracts the other price's net value (and VAT) from the own amount.
    pub fn subtract(&mut self, other: &Price) -> PriceResult<()> {
        self.unit.ensure_same(&other.unit)?;
        let (net, vat) = other.exact_totals()?;
        self.shift_own(-net, -vat)
    }

    /// Moves the own net and own VAT by the given deltas, all or nothing.
    fn shift_own(&mut self, net: Decimal, vat: Decimal) -> PriceResult<()> {
        let mut base = self.base.clone();
        base.add_value(net)?;
        if let Some(split) = self.vat_split.as_mut() {
            split.initial_vat_amount.add_value(vat)?;
        }
        self.base = base;
        self.dirty = true;
        Ok(())
    }

    /// Adds a plain net number (major units, no VAT) to the own amount.
    pub fn add_value(&mut self, value: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.base.add_value(value)?;
        self.dirty = true;
        Ok(self)
    }

    /// Subtracts a plain net number (major units, no VAT).
    pub fn subtract_value(&mut self, value: impl Into<Decimal>) -> PriceResult<&mut Self> {
        self.base.subtract_value(value)?;
        self.dirty = true;
        Ok(self)
    }

    /// Scales the own amount, the own VAT and every nested price.
    ///
    /// Zero and negative factors are allowed. On overflow the price is
    /// left exactly as it was.
    pub fn multiply(&mut self, factor: impl Into<Decimal>) -> PriceResult<&mut Self> {
        let mut scaled = self.clone();
        scaled.scale_by(factor.into())?;
        *self = scaled;
        Ok(self)
    }

    fn scale_by(&mut self, factor: Decimal) -> PriceResult<()> {
        self.base.multiply(factor)?;
        if let Some(split) = self.vat_split.as_mut() {
            split.initial_vat_amount.multiply(factor)?;
        }
        for nested in self.nested.values_mut() {
            nested.scale_by(factor)?;
        }
        self.dirty = true;
        Ok(())
    }

    /// Inserts or replaces the nested price for `category`.
    ///
    /// The nested price and its whole subtree are converted to this price's
    /// variant first: plain prices under a VAT-aware parent get VAT = 0,
    /// VAT-aware prices under a plain parent lose their VAT tracking.
    pub fn set_nested_price(&mut self, category: impl Into<String>, mut price: Price) -> PriceResult<()> {
        self.unit.ensure_same(&price.unit)?;
        let category = category.into();

        let vat_aware = self.vat_split.is_some();
        match (vat_aware, price.vat_split.is_some()) {
            (true, false) => trace!(%category, "Promoting nested price to VAT-aware"),
            (false, true) => trace!(%category, "Dropping VAT tracking of nested price"),
            _ => {}
        }
        price.align_variant(vat_aware);

        self.nested.insert(category, price);
        self.dirty = true;
        Ok(())
    }

    fn align_variant(&mut self, vat_aware: bool) {
        match (vat_aware, self.vat_split.is_some()) {
            (true, false) => self.vat_split = Some(VatSplit::zero(self.scale())),
            (false, true) => self.vat_split = None,
            _ => {}
        }
        for nested in self.nested.values_mut() {
            nested.align_variant(vat_aware);
        }
        self.dirty = true;
    }

    /// Removes a nested category, keeping the order of the others.
    pub fn remove_nested_price(&mut self, category: &str) -> Option<Price> {
        let removed = self.nested.shift_remove(category)?;
        self.dirty = true;
        Some(removed)
    }

    // =========================================================================
    // Computation
    // =========================================================================

    /// Recomputes the aggregate if dirty, then runs the attached policy.
    ///
    /// Net = own base + computed net of every nested price.
    /// VAT = own VAT + computed VAT of every nested price, rebuilt from the
    /// own VAT each time (never accumulated across computes).
    pub(crate) fn compute(&mut self) -> PriceResult<()> {
        if self.dirty {
            let mut net = self.base.clone();
            let mut vat = self
                .vat_split
                .as_ref()
                .map(|split| split.initial_vat_amount.clone());

            for nested in self.nested.values_mut() {
                nested.compute()?;
                net.add(&nested.amount)?;
                if let (Some(vat), Some(nested_split)) = (vat.as_mut(), nested.vat_split.as_ref()) {
                    vat.add(&nested_split.vat_amount)?;
                }
            }

            self.amount = net;
            if let (Some(split), Some(vat)) = (self.vat_split.as_mut(), vat) {
                split.vat_amount = vat;
            }
            self.dirty = false;

            debug!(
                currency = %self.unit,
                net = %self.amount.exact(),
                vat = ?self.vat_split.as_ref().map(|s| s.vat_amount.exact()),
                nested = self.nested.len(),
                "Price recomputed"
            );
        }

        if let Some(policy) = self.policy {
            policy.check(self)?;
        }
        Ok(())
    }

    /// Exact (net, VAT) totals without touching cached state.
    ///
    /// Used to read prices passed by shared reference (`add`, `subtract`,
    /// the positivity groups). VAT is zero for plain prices.
    pub fn exact_totals(&self) -> PriceResult<(Decimal, Decimal)> {
        if !self.dirty {
            let vat = self
                .vat_split
                .as_ref()
                .map_or(Decimal::ZERO, |split| split.vat_amount.exact());
            return Ok((self.amount.exact(), vat));
        }

        let mut net = self.base.exact();
        let mut vat = self
            .vat_split
            .as_ref()
            .map_or(Decimal::ZERO, |split| split.initial_vat_amount.exact());

        for nested in self.nested.values() {
            let (nested_net, nested_vat) = nested.exact_totals()?;
            net = checked(net.checked_add(nested_net), "add")?;
            if self.vat_split.is_some() {
                vat = checked(vat.checked_add(nested_vat), "add")?;
            }
        }
        Ok((net, vat))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
