//! Typed data of the nine-step Agreement Wizard.
//!
//! Every field an operator fills in is optional (or defaulted) so a
//! partially completed draft always deserializes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{DateRange, Discount, Driver, RateCard, RateContext};

/// Step indices of the agreement wizard, in display order.
pub const SOURCE_STEP: usize = 0;
pub const CUSTOMER_STEP: usize = 1;
pub const VEHICLE_STEP: usize = 2;
pub const RENTAL_PERIOD_STEP: usize = 3;
pub const DRIVERS_STEP: usize = 4;
pub const INSURANCE_STEP: usize = 5;
pub const ADDONS_STEP: usize = 6;
pub const PAYMENT_STEP: usize = 7;
pub const REVIEW_STEP: usize = 8;

/// Number of agreement wizard steps.
pub const AGREEMENT_STEP_COUNT: usize = 9;

/// Where an agreement originates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgreementSource {
    /// Walk-in customer, no prior booking.
    Direct,
    /// Converted from an existing reservation.
    Reservation { reservation_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStep {
    #[serde(default)]
    pub source: Option<AgreementSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStep {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub licence_number: Option<String>,
    #[serde(default)]
    pub licence_expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStep {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub odometer_out: Option<i64>,
    #[serde(default)]
    pub fuel_level_percent: Option<i32>,
    /// Rate panel values for this agreement.
    #[serde(default)]
    pub rates: RateContext,
    /// Rates of the vehicle's price list, used when the panel leaves a tier at zero.
    #[serde(default)]
    pub price_list_rates: RateCard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriodStep {
    #[serde(default)]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub return_location: Option<String>,
}

impl RentalPeriodStep {
    /// The rental interval, when both ends are set.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.pickup_at, self.return_at) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriversStep {
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceStep {
    /// Selected cover option (e.g. "basic", "full").
    #[serde(default)]
    pub coverage: Option<String>,
    #[serde(default)]
    pub daily_charge: Decimal,
    #[serde(default)]
    pub deductible: Decimal,
}

/// An optional extra (child seat, GPS, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonsStep {
    #[serde(default)]
    pub addons: Vec<Addon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Invoice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStep {
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub deposit: Decimal,
    #[serde(default)]
    pub card_last_four: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStep {
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub signature_captured: bool,
}

/// All data of one agreement wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementData {
    #[serde(default)]
    pub source: SourceStep,
    #[serde(default)]
    pub customer: CustomerStep,
    #[serde(default)]
    pub vehicle: VehicleStep,
    #[serde(default)]
    pub rental_period: RentalPeriodStep,
    #[serde(default)]
    pub drivers: DriversStep,
    #[serde(default)]
    pub insurance: InsuranceStep,
    #[serde(default)]
    pub addons: AddonsStep,
    #[serde(default)]
    pub payment: PaymentStep,
    #[serde(default)]
    pub review: ReviewStep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_deserializes_to_default() {
        let data: AgreementData = serde_json::from_str("{}").unwrap();
        assert_eq!(data, AgreementData::default());
    }

    #[test]
    fn test_partial_draft_deserializes() {
        let json = r#"{"source":{"source":{"type":"direct"}},"vehicle":{"vehicle_id":"VAN-7"}}"#;
        let data: AgreementData = serde_json::from_str(json).unwrap();
        assert_eq!(data.source.source, Some(AgreementSource::Direct));
        assert_eq!(data.vehicle.vehicle_id.as_deref(), Some("VAN-7"));
        assert!(data.rental_period.date_range().is_none());
    }
}
