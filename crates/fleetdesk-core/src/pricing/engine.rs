//! Tiered line pricing and repricing.
//!
//! A line is priced by picking the coarsest rate tier the rental duration
//! qualifies for, billing whole units of that tier (partial units round up),
//! adding driver surcharges and insurance, subtracting any discount, and
//! applying the fixed 10% tax.
//!
//! Every function here is a pure function of its arguments: pricing never
//! reads the clock, so pricing the same inputs twice gives identical output.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use fleetdesk_types::config::PricingConfig;
use fleetdesk_types::pricing::{
    DateRange, Discount, Driver, LinePrice, PriceSource, PricedLine, RateCard, RateContext,
    RateTier,
};
use fleetdesk_types::reservation::LinePrefill;

use crate::hash::ContentHasher;

/// Car-rental tax rate (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Rentals of at least this many days qualify for the monthly tier.
const MONTHLY_THRESHOLD_DAYS: i64 = 28;

/// Rentals of at least this many days qualify for the weekly tier.
const WEEKLY_THRESHOLD_DAYS: i64 = 7;

/// Errors that can occur while pricing a line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// The return time is not after the pickup time.
    #[error("return must be after pickup")]
    InvalidRange,

    /// Neither the rate panel nor the price list offers a usable tier.
    #[error("no rate available for a rental of {duration_hours} hours")]
    NoApplicableRate { duration_hours: i64 },

    /// A line cannot be created until the prefill names these fields.
    #[error("line prefill is missing: {}", missing.join(", "))]
    IncompletePrefill { missing: Vec<String> },

    /// The builder has no rental dates to price.
    #[error("rental dates are not set")]
    MissingDates,
}

/// The rate chosen for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSelection {
    pub tier: RateTier,
    pub units: u32,
    pub unit_rate: Decimal,
    pub source: PriceSource,
}

/// Optional per-line inputs beyond rates and dates.
#[derive(Debug, Clone, Default)]
pub struct LineExtras<'a> {
    pub drivers: &'a [Driver],
    pub discount: Option<&'a Discount>,
    pub insurance_daily: Decimal,
    /// Date driver ages are evaluated at; defaults to the pickup date.
    pub as_of: Option<NaiveDate>,
}

/// Pricing engine, generic over the hasher used to fingerprint rate contexts.
pub struct PricingEngine<H: ContentHasher> {
    config: PricingConfig,
    hasher: H,
}

impl<H: ContentHasher> PricingEngine<H> {
    pub fn new(config: PricingConfig, hasher: H) -> Self {
        Self { config, hasher }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Structural hash of a rate context, covering every field.
    pub fn context_hash(&self, context: &RateContext) -> String {
        self.hasher.compute_hash(&context.canonical_form())
    }

    // -----------------------------------------------------------------------
    // Rate selection
    // -----------------------------------------------------------------------

    /// Pick the tier, unit count, rate and source for `range`.
    ///
    /// Tiers are tried coarsest first among those the duration qualifies for
    /// (monthly from 28 days, weekly from 7 days, daily, and hourly only under
    /// 24 hours). Within a tier the panel rate wins over the price list rate;
    /// a zero rate means the tier is not offered by that source, and a finer
    /// tier is only used when neither source offers the coarser one.
    pub fn select_rate(
        &self,
        panel: &RateCard,
        fallback: &RateCard,
        range: &DateRange,
    ) -> Result<RateSelection, PricingError> {
        let seconds = range.duration_seconds();
        if seconds <= 0 {
            return Err(PricingError::InvalidRange);
        }

        for &tier in candidate_tiers(seconds) {
            let offered = [(panel, PriceSource::Panel), (fallback, PriceSource::Pricelist)]
                .into_iter()
                .map(|(card, source)| (card.rate_for(tier), source))
                .find(|(rate, _)| *rate > Decimal::ZERO);
            if let Some((unit_rate, source)) = offered {
                return Ok(RateSelection {
                    tier,
                    units: self.billable_units(tier, seconds),
                    unit_rate,
                    source,
                });
            }
        }

        Err(PricingError::NoApplicableRate {
            duration_hours: ceil_div(seconds, SECONDS_PER_HOUR),
        })
    }

    /// Whole units of `tier` needed to cover `seconds`, rounding up.
    pub fn billable_units(&self, tier: RateTier, seconds: i64) -> u32 {
        let unit_seconds = match tier {
            RateTier::Hourly => SECONDS_PER_HOUR,
            RateTier::Daily => SECONDS_PER_DAY,
            RateTier::Weekly => WEEKLY_THRESHOLD_DAYS * SECONDS_PER_DAY,
            RateTier::Monthly => i64::from(self.config.month_days.max(1)) * SECONDS_PER_DAY,
        };
        u32::try_from(ceil_div(seconds, unit_seconds)).unwrap_or(u32::MAX)
    }

    // -----------------------------------------------------------------------
    // Line pricing
    // -----------------------------------------------------------------------

    /// Price a bare line: rates and dates only.
    pub fn price_line(
        &self,
        context: &RateContext,
        range: &DateRange,
        fallback: &RateCard,
    ) -> Result<LinePrice, PricingError> {
        self.price_line_with(context, range, fallback, &LineExtras::default())
    }

    /// Price a line including drivers, insurance and discount.
    pub fn price_line_with(
        &self,
        context: &RateContext,
        range: &DateRange,
        fallback: &RateCard,
        extras: &LineExtras<'_>,
    ) -> Result<LinePrice, PricingError> {
        let selection = self.select_rate(&context.rates(), fallback, range)?;
        let rental_charge = round_money(selection.unit_rate * Decimal::from(selection.units));

        let as_of = extras.as_of.unwrap_or_else(|| range.start.date_naive());
        let driver_fees = self.driver_fees(extras.drivers, as_of);

        let insurance_days = self.billable_units(RateTier::Daily, range.duration_seconds()).max(1);
        let insurance = round_money(extras.insurance_daily * Decimal::from(insurance_days));

        let gross = rental_charge + driver_fees + insurance;
        let discount = extras
            .discount
            .map(|discount| discount_amount(discount, gross))
            .unwrap_or(Decimal::ZERO);
        let line_net_price = gross - discount;
        let tax = tax_on(line_net_price);

        Ok(LinePrice {
            tier: selection.tier,
            units: selection.units,
            unit_rate: selection.unit_rate,
            source: selection.source,
            rental_charge,
            driver_fees,
            insurance,
            discount,
            line_net_price,
            tax,
            line_total: line_net_price + tax,
        })
    }

    /// Flat surcharges for non-primary and young drivers.
    ///
    /// When no driver is flagged primary, the first listed driver is.
    pub fn driver_fees(&self, drivers: &[Driver], as_of: NaiveDate) -> Decimal {
        let any_primary = drivers.iter().any(|driver| driver.primary);
        let mut fees = Decimal::ZERO;

        for (position, driver) in drivers.iter().enumerate() {
            let is_primary = if any_primary {
                driver.primary
            } else {
                position == 0
            };
            if !is_primary {
                fees += self.config.additional_driver_fee;
            }

            let young = driver
                .date_of_birth
                .and_then(|dob| as_of.years_since(dob))
                .is_some_and(|age| age < self.config.young_driver_age);
            if young {
                fees += self.config.young_driver_fee;
            }
        }
        fees
    }

    /// Charge for distance driven beyond the daily allowance.
    pub fn mileage_charge(&self, context: &RateContext, range: &DateRange, driven_km: u32) -> Decimal {
        if context.daily_kilometer_allowed == 0 || context.kilometer_charge <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let days = self.billable_units(RateTier::Daily, range.duration_seconds()).max(1);
        let allowance = u64::from(context.daily_kilometer_allowed) * u64::from(days);
        let excess = u64::from(driven_km).saturating_sub(allowance);
        round_money(context.kilometer_charge * Decimal::from(excess))
    }

    // -----------------------------------------------------------------------
    // Reservation lines
    // -----------------------------------------------------------------------

    /// Create and price a new line from a fully specified prefill.
    pub fn create_line(
        &self,
        prefill: &LinePrefill,
        context: &RateContext,
        fallback: &RateCard,
        now: DateTime<Utc>,
    ) -> Result<PricedLine, PricingError> {
        let missing = prefill.missing_fields();
        if !missing.is_empty() {
            return Err(PricingError::IncompletePrefill {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }
        let range = prefill.date_range().ok_or(PricingError::MissingDates)?;

        let extras = LineExtras {
            drivers: &prefill.drivers,
            discount: prefill.discount.as_ref(),
            insurance_daily: prefill.insurance_daily,
            as_of: Some(now.date_naive()),
        };
        let price = self.price_line_with(context, &range, fallback, &extras)?;

        Ok(PricedLine {
            id: Uuid::now_v7(),
            vehicle_id: prefill.vehicle_id.clone().unwrap_or_default(),
            pickup_location: prefill.pickup_location.clone().unwrap_or_default(),
            return_location: prefill.return_location.clone().unwrap_or_default(),
            date_range: Some(range),
            drivers: prefill.drivers.clone(),
            discount: prefill.discount.clone(),
            insurance_daily: prefill.insurance_daily,
            base_price: price.line_net_price,
            tax_value: price.tax,
            line_total: price.line_total,
            price_source: price.source,
            rate_context_hash_at_pricing: self.context_hash(context),
            created_at: now,
        })
    }

    /// Re-derive one line from scratch against `context`.
    ///
    /// Identity fields are kept; every derived field is overwritten.
    pub fn reprice_line(
        &self,
        line: &PricedLine,
        context: &RateContext,
        context_hash: &str,
        fallback: &RateCard,
    ) -> Result<PricedLine, PricingError> {
        let range = line.date_range.ok_or(PricingError::MissingDates)?;
        let extras = LineExtras {
            drivers: &line.drivers,
            discount: line.discount.as_ref(),
            insurance_daily: line.insurance_daily,
            as_of: Some(line.created_at.date_naive()),
        };
        let price = self.price_line_with(context, &range, fallback, &extras)?;

        Ok(PricedLine {
            base_price: price.line_net_price,
            tax_value: price.tax,
            line_total: price.line_total,
            price_source: price.source,
            rate_context_hash_at_pricing: context_hash.to_string(),
            ..line.clone()
        })
    }

    /// Reprice every dated line; undated lines pass through unchanged.
    ///
    /// A dated line that cannot be priced (reversed dates, no rate) is also
    /// passed through unchanged and keeps its old context hash, so it stays
    /// visibly stale.
    pub fn reprice(
        &self,
        lines: &[PricedLine],
        context: &RateContext,
        fallback: &RateCard,
    ) -> Vec<PricedLine> {
        let context_hash = self.context_hash(context);
        lines
            .iter()
            .map(|line| {
                if line.date_range.is_none() {
                    return line.clone();
                }
                match self.reprice_line(line, context, &context_hash, fallback) {
                    Ok(repriced) => repriced,
                    Err(e) => {
                        tracing::warn!(line_id = %line.id, error = %e, "line left unpriced during reprice");
                        line.clone()
                    }
                }
            })
            .collect()
    }
}

/// Tiers a duration qualifies for, coarsest first.
fn candidate_tiers(seconds: i64) -> &'static [RateTier] {
    if seconds >= MONTHLY_THRESHOLD_DAYS * SECONDS_PER_DAY {
        &[RateTier::Monthly, RateTier::Weekly, RateTier::Daily]
    } else if seconds >= WEEKLY_THRESHOLD_DAYS * SECONDS_PER_DAY {
        &[RateTier::Weekly, RateTier::Daily]
    } else if seconds >= SECONDS_PER_DAY {
        &[RateTier::Daily]
    } else {
        &[RateTier::Hourly, RateTier::Daily]
    }
}

fn ceil_div(value: i64, unit: i64) -> i64 {
    (value + unit - 1) / unit
}

/// Round to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax due on a net amount.
pub fn tax_on(net: Decimal) -> Decimal {
    round_money(net * TAX_RATE)
}

/// Amount a discount takes off `gross`, never more than `gross` itself.
pub fn discount_amount(discount: &Discount, gross: Decimal) -> Decimal {
    let raw = match discount {
        Discount::Percent(percent) => round_money(gross * *percent / Decimal::ONE_HUNDRED),
        Discount::Amount(amount) => *amount,
    };
    raw.clamp(Decimal::ZERO, gross.max(Decimal::ZERO))
}
