//! Price summary of an agreement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fleetdesk_types::agreement::AgreementData;
use fleetdesk_types::pricing::{PriceSource, RateTier};

use super::engine::{discount_amount, round_money, tax_on, LineExtras, PricingEngine, PricingError};
use crate::hash::ContentHasher;

/// Every component of an agreement's price, as shown on the review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub tier: RateTier,
    pub units: u32,
    pub unit_rate: Decimal,
    pub source: PriceSource,
    pub rental_charge: Decimal,
    pub driver_fees: Decimal,
    pub insurance: Decimal,
    pub addons: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl<H: ContentHasher> PricingEngine<H> {
    /// Price an agreement from its vehicle, period, drivers, cover and extras.
    ///
    /// The payment discount applies to the sum of rental, fees, insurance
    /// and add-ons.
    pub fn agreement_breakdown(&self, data: &AgreementData) -> Result<PricingBreakdown, PricingError> {
        let range = data
            .rental_period
            .date_range()
            .ok_or(PricingError::MissingDates)?;
        let extras = LineExtras {
            drivers: &data.drivers.drivers,
            discount: None,
            insurance_daily: data.insurance.daily_charge,
            as_of: Some(range.start.date_naive()),
        };
        let line = self.price_line_with(
            &data.vehicle.rates,
            &range,
            &data.vehicle.price_list_rates,
            &extras,
        )?;

        let addons = round_money(
            data.addons
                .addons
                .iter()
                .map(|addon| addon.unit_price * Decimal::from(addon.quantity))
                .sum(),
        );
        let gross = line.line_net_price + addons;
        let discount = data
            .payment
            .discount
            .as_ref()
            .map(|discount| discount_amount(discount, gross))
            .unwrap_or(Decimal::ZERO);
        let net = gross - discount;
        let tax = tax_on(net);

        Ok(PricingBreakdown {
            tier: line.tier,
            units: line.units,
            unit_rate: line.unit_rate,
            source: line.source,
            rental_charge: line.rental_charge,
            driver_fees: line.driver_fees,
            insurance: line.insurance,
            addons,
            discount,
            net,
            tax,
            total: net + tax,
        })
    }
}
