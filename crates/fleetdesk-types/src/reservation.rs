//! Typed data of the Reservation Builder (accordion sections).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{DateRange, Discount, Driver, PricedLine, RateCard, RateContext};

/// Section indices of the reservation builder, in display order.
pub const GENERAL_SECTION: usize = 0;
pub const RATES_SECTION: usize = 1;
pub const LINES_SECTION: usize = 2;
pub const NOTES_SECTION: usize = 3;

/// Number of reservation builder sections.
pub const RESERVATION_SECTION_COUNT: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationGeneral {
    #[serde(default)]
    pub customer_id: Option<String>,
    /// External booking reference (broker, web channel).
    #[serde(default)]
    pub reference: Option<String>,
}

/// Values used to create a new reservation line.
///
/// A line is only created when the prefill is fully specified: vehicle,
/// both dates and both locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrefill {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub return_location: Option<String>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub insurance_daily: Decimal,
}

impl LinePrefill {
    /// Names of the required prefill fields that are still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.vehicle_id.as_deref().is_none_or(|v| v.trim().is_empty()) {
            missing.push("vehicle");
        }
        if self.pickup_at.is_none() {
            missing.push("pickup date");
        }
        if self.return_at.is_none() {
            missing.push("return date");
        }
        if self.pickup_location.as_deref().is_none_or(|v| v.trim().is_empty()) {
            missing.push("pickup location");
        }
        if self.return_location.as_deref().is_none_or(|v| v.trim().is_empty()) {
            missing.push("return location");
        }
        missing
    }

    /// The rental interval, when both ends are set.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.pickup_at, self.return_at) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }
}

/// All data of one reservation builder session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationData {
    #[serde(default)]
    pub general: ReservationGeneral,
    #[serde(default)]
    pub rates: RateContext,
    /// Rates of the selected price list, the fallback for zero panel tiers.
    #[serde(default)]
    pub price_list_rates: RateCard,
    #[serde(default)]
    pub lines: Vec<PricedLine>,
    #[serde(default)]
    pub notes: String,
}

impl ReservationData {
    /// Sum of all line totals.
    pub fn grand_total(&self) -> Decimal {
        self.lines.iter().map(|line| line.line_total).sum()
    }
}
