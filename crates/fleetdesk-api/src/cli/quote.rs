//! `fdesk quote`: price a single rental line without opening a draft.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use console::style;
use rust_decimal::Decimal;

use fleetdesk_core::pricing::{LineExtras, PricingEngine, PricingError};
use fleetdesk_infra::crypto::hash::Sha256ContentHasher;
use fleetdesk_types::config::PricingConfig;
use fleetdesk_types::pricing::{DateRange, Discount, Driver, LinePrice, RateCard, RateContext};

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    /// Pickup time (RFC 3339, e.g. 2026-03-01T10:00:00Z).
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// Return time (RFC 3339).
    #[arg(long)]
    pub end: DateTime<Utc>,

    /// Panel hourly rate.
    #[arg(long, default_value = "0")]
    pub hourly: Decimal,

    /// Panel daily rate.
    #[arg(long, default_value = "0")]
    pub daily: Decimal,

    /// Panel weekly rate.
    #[arg(long, default_value = "0")]
    pub weekly: Decimal,

    /// Panel monthly rate.
    #[arg(long, default_value = "0")]
    pub monthly: Decimal,

    /// Price list hourly rate, used when the panel has none.
    #[arg(long, default_value = "0")]
    pub fallback_hourly: Decimal,

    #[arg(long, default_value = "0")]
    pub fallback_daily: Decimal,

    #[arg(long, default_value = "0")]
    pub fallback_weekly: Decimal,

    #[arg(long, default_value = "0")]
    pub fallback_monthly: Decimal,

    /// Percentage discount on the net price.
    #[arg(long, conflicts_with = "discount_amount")]
    pub discount_percent: Option<Decimal>,

    /// Fixed discount on the net price.
    #[arg(long)]
    pub discount_amount: Option<Decimal>,

    /// Daily insurance charge.
    #[arg(long, default_value = "0")]
    pub insurance_daily: Decimal,

    /// Date of birth of each driver (YYYY-MM-DD); the first is primary.
    #[arg(long = "driver-dob")]
    pub driver_dob: Vec<NaiveDate>,

    /// Charge per kilometer above the allowance.
    #[arg(long, default_value = "0")]
    pub km_charge: Decimal,

    /// Kilometers included per day.
    #[arg(long, default_value = "0")]
    pub km_allowed: u32,

    /// Expected distance, to estimate the excess mileage charge.
    #[arg(long)]
    pub driven_km: Option<u32>,
}

impl QuoteArgs {
    fn rate_context(&self) -> RateContext {
        RateContext {
            hourly_rate: self.hourly,
            daily_rate: self.daily,
            weekly_rate: self.weekly,
            monthly_rate: self.monthly,
            kilometer_charge: self.km_charge,
            daily_kilometer_allowed: self.km_allowed,
            ..Default::default()
        }
    }

    fn fallback(&self) -> RateCard {
        RateCard {
            hourly_rate: self.fallback_hourly,
            daily_rate: self.fallback_daily,
            weekly_rate: self.fallback_weekly,
            monthly_rate: self.fallback_monthly,
        }
    }

    fn discount(&self) -> Option<Discount> {
        self.discount_percent
            .map(Discount::Percent)
            .or(self.discount_amount.map(Discount::Amount))
    }

    fn drivers(&self) -> Vec<Driver> {
        self.driver_dob
            .iter()
            .enumerate()
            .map(|(position, dob)| Driver {
                name: format!("Driver {}", position + 1),
                date_of_birth: Some(*dob),
                primary: position == 0,
            })
            .collect()
    }
}

/// A priced quote plus its estimated mileage charge.
#[derive(Debug, Clone)]
pub struct Quote {
    pub price: LinePrice,
    /// Charged on return; not part of the line total.
    pub mileage: Option<Decimal>,
    pub context_hash: String,
}

/// Price the line described by `args`.
pub fn build_quote(config: &PricingConfig, args: &QuoteArgs) -> Result<Quote, PricingError> {
    let engine = PricingEngine::new(config.clone(), Sha256ContentHasher);
    let context = args.rate_context();
    let range = DateRange::new(args.start, args.end);
    let drivers = args.drivers();
    let discount = args.discount();

    let extras = LineExtras {
        drivers: &drivers,
        discount: discount.as_ref(),
        insurance_daily: args.insurance_daily,
        as_of: None,
    };
    let price = engine.price_line_with(&context, &range, &args.fallback(), &extras)?;
    let mileage = args
        .driven_km
        .map(|km| engine.mileage_charge(&context, &range, km));

    Ok(Quote {
        price,
        mileage,
        context_hash: engine.context_hash(&context),
    })
}

pub fn quote(config: &PricingConfig, args: &QuoteArgs, json: bool) -> Result<()> {
    let quote = build_quote(config, args)?;
    let price = &quote.price;
    tracing::debug!(tier = %price.tier, units = price.units, total = %price.line_total, "quote priced");

    if json {
        let mut value = serde_json::to_value(price)?;
        value["mileage"] = serde_json::to_value(quote.mileage)?;
        value["rate_context_hash"] = serde_json::Value::String(quote.context_hash.clone());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} x {} {} @ {} ({})",
        style("Quote").bold(),
        price.units,
        price.tier,
        if price.units == 1 { "unit" } else { "units" },
        price.unit_rate,
        style(price.source).dim()
    );
    println!();
    println!("  Rental:       {:>10}", price.rental_charge.to_string());
    if !price.driver_fees.is_zero() {
        println!("  Driver fees:  {:>10}", price.driver_fees.to_string());
    }
    if !price.insurance.is_zero() {
        println!("  Insurance:    {:>10}", price.insurance.to_string());
    }
    if !price.discount.is_zero() {
        println!("  Discount:     {:>10}", format!("-{}", price.discount));
    }
    println!("  Net:          {:>10}", price.line_net_price.to_string());
    println!("  Tax (10%):    {:>10}", price.tax.to_string());
    println!(
        "  {}        {}",
        style("Total:").bold(),
        style(format!("{:>10}", price.line_total.to_string())).bold()
    );
    if let Some(mileage) = quote.mileage {
        println!();
        println!("  Excess mileage on return: {}", style(mileage).yellow());
    }
    println!();
    Ok(())
}
