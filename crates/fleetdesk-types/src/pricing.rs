//! Rate and priced-line types.
//!
//! Money amounts are `rust_decimal::Decimal` so that totals are exact and
//! repricing the same inputs always yields identical values.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// The four tiered rates of a vehicle. A zero rate means "not offered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    #[serde(default)]
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub daily_rate: Decimal,
    #[serde(default)]
    pub weekly_rate: Decimal,
    #[serde(default)]
    pub monthly_rate: Decimal,
}

impl RateCard {
    /// Rate for the given tier.
    pub fn rate_for(&self, tier: RateTier) -> Decimal {
        match tier {
            RateTier::Hourly => self.hourly_rate,
            RateTier::Daily => self.daily_rate,
            RateTier::Weekly => self.weekly_rate,
            RateTier::Monthly => self.monthly_rate,
        }
    }
}

/// Operator-entered pricing inputs of a builder (the "rate panel").
///
/// Identity is structural: two contexts with equal field values are the same
/// context. [`RateContext::canonical_form`] is the hashing input used for
/// staleness detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateContext {
    #[serde(default)]
    pub price_list_id: Option<String>,
    #[serde(default)]
    pub promotion_code: Option<String>,
    #[serde(default)]
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub daily_rate: Decimal,
    #[serde(default)]
    pub weekly_rate: Decimal,
    #[serde(default)]
    pub monthly_rate: Decimal,
    #[serde(default)]
    pub kilometer_charge: Decimal,
    #[serde(default)]
    pub daily_kilometer_allowed: u32,
}

impl RateContext {
    /// The tiered rates of this context.
    pub fn rates(&self) -> RateCard {
        RateCard {
            hourly_rate: self.hourly_rate,
            daily_rate: self.daily_rate,
            weekly_rate: self.weekly_rate,
            monthly_rate: self.monthly_rate,
        }
    }

    /// Stable textual form covering every field.
    ///
    /// Decimals are normalized so `50` and `50.00` produce the same form.
    /// Text fields are length-prefixed and `None` is written as `-`, so no
    /// two distinct contexts share a form.
    pub fn canonical_form(&self) -> String {
        format!(
            "price_list_id={}|promotion_code={}|hourly_rate={}|daily_rate={}|weekly_rate={}|monthly_rate={}|kilometer_charge={}|daily_kilometer_allowed={}",
            canonical_text(self.price_list_id.as_deref()),
            canonical_text(self.promotion_code.as_deref()),
            self.hourly_rate.normalize(),
            self.daily_rate.normalize(),
            self.weekly_rate.normalize(),
            self.monthly_rate.normalize(),
            self.kilometer_charge.normalize(),
            self.daily_kilometer_allowed,
        )
    }
}

fn canonical_text(value: Option<&str>) -> String {
    match value {
        None => "-".to_string(),
        Some(text) => format!("{}:{text}", text.len()),
    }
}

/// Billing granularity used to price a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTier {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for RateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateTier::Hourly => write!(f, "hourly"),
            RateTier::Daily => write!(f, "daily"),
            RateTier::Weekly => write!(f, "weekly"),
            RateTier::Monthly => write!(f, "monthly"),
        }
    }
}

/// Where the applied rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Operator-entered rate panel (`RateContext`).
    Panel,
    /// Price list fallback rates.
    Pricelist,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::Panel => write!(f, "panel"),
            PriceSource::Pricelist => write!(f, "pricelist"),
        }
    }
}

// ---------------------------------------------------------------------------
// Line inputs
// ---------------------------------------------------------------------------

/// Pickup/return interval of a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length of the interval in whole seconds (negative when reversed).
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// A driver assigned to a rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Primary drivers carry no additional-driver fee.
    #[serde(default)]
    pub primary: bool,
}

/// Discount applied to a line's net price before tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the net price (e.g. `10` for 10%).
    Percent(Decimal),
    /// Fixed amount off the net price.
    Amount(Decimal),
}

// ---------------------------------------------------------------------------
// Pricing outputs
// ---------------------------------------------------------------------------

/// Full derivation of one priced line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrice {
    pub tier: RateTier,
    /// Number of whole tier units billed (partial units round up).
    pub units: u32,
    pub unit_rate: Decimal,
    pub source: PriceSource,
    /// `unit_rate * units`.
    pub rental_charge: Decimal,
    pub driver_fees: Decimal,
    pub insurance: Decimal,
    pub discount: Decimal,
    /// Rental charge + driver fees + insurance - discount.
    pub line_net_price: Decimal,
    pub tax: Decimal,
    pub line_total: Decimal,
}

/// A reservation line with its derived pricing.
///
/// Identity fields (`id`, vehicle, locations, drivers, discount, insurance)
/// are owned by the operator; derived fields (`base_price`, `tax_value`,
/// `line_total`, `price_source`, `rate_context_hash_at_pricing`) are only
/// ever written by pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub id: Uuid,
    pub vehicle_id: String,
    pub pickup_location: String,
    pub return_location: String,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub discount: Option<Discount>,
    /// Daily insurance charge; zero when no cover is attached.
    #[serde(default)]
    pub insurance_daily: Decimal,
    pub base_price: Decimal,
    pub tax_value: Decimal,
    pub line_total: Decimal,
    pub price_source: PriceSource,
    pub rate_context_hash_at_pricing: String,
    /// Creation time; driver ages are evaluated against this date.
    pub created_at: DateTime<Utc>,
}

impl PricedLine {
    /// Whether this line was priced against a different rate context.
    pub fn is_stale(&self, current_context_hash: &str) -> bool {
        self.rate_context_hash_at_pricing != current_context_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_canonical_form_normalizes_decimals() {
        let a = RateContext {
            daily_rate: dec!(50),
            ..Default::default()
        };
        let b = RateContext {
            daily_rate: dec!(50.00),
            ..Default::default()
        };
        assert_eq!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn test_canonical_form_covers_every_field() {
        let base = RateContext::default();
        let variants = [
            RateContext { price_list_id: Some("PL-1".to_string()), ..base.clone() },
            RateContext { promotion_code: Some("SUMMER".to_string()), ..base.clone() },
            RateContext { hourly_rate: dec!(1), ..base.clone() },
            RateContext { daily_rate: dec!(1), ..base.clone() },
            RateContext { weekly_rate: dec!(1), ..base.clone() },
            RateContext { monthly_rate: dec!(1), ..base.clone() },
            RateContext { kilometer_charge: dec!(1), ..base.clone() },
            RateContext { daily_kilometer_allowed: 1, ..base.clone() },
        ];
        for variant in &variants {
            assert_ne!(variant.canonical_form(), base.canonical_form(), "{variant:?}");
        }
    }

    #[test]
    fn test_canonical_form_tells_empty_from_absent() {
        let absent = RateContext::default();
        let empty = RateContext {
            promotion_code: Some(String::new()),
            ..Default::default()
        };
        assert_ne!(absent.canonical_form(), empty.canonical_form());
    }

    #[test]
    fn test_canonical_form_separator_in_text_is_unambiguous() {
        let a = RateContext {
            price_list_id: Some("x|promotion_code=y".to_string()),
            promotion_code: Some(String::new()),
            ..Default::default()
        };
        let b = RateContext {
            price_list_id: Some("x".to_string()),
            promotion_code: Some("y|promotion_code=".to_string()),
            ..Default::default()
        };
        assert_ne!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn test_rate_card_lookup_by_tier() {
        let card = RateCard {
            hourly_rate: dec!(8),
            daily_rate: dec!(50),
            weekly_rate: dec!(300),
            monthly_rate: dec!(1000),
        };
        assert_eq!(card.rate_for(RateTier::Hourly), dec!(8));
        assert_eq!(card.rate_for(RateTier::Monthly), dec!(1000));
    }

    #[test]
    fn test_discount_serde_tagged() {
        let json = serde_json::to_value(Discount::Percent(dec!(10))).unwrap();
        assert_eq!(json["type"], "percent");
        let parsed: Discount = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, Discount::Percent(dec!(10)));
    }

    #[test]
    fn test_date_range_duration() {
        let start = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2026-03-02T11:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(DateRange::new(start, end).duration_seconds(), 25 * 3600);
    }
}
