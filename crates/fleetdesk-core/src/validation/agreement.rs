//! Rule set of the nine-step Agreement Wizard.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use fleetdesk_types::agreement::{
    AgreementData, AgreementSource, PaymentMethod, CUSTOMER_STEP, DRIVERS_STEP, RENTAL_PERIOD_STEP,
};
use fleetdesk_types::config::PricingConfig;
use fleetdesk_types::pricing::{Discount, RateCard, RateContext};
use fleetdesk_types::progress::StepConfig;
use fleetdesk_types::validation::ValidationResult;

use super::{Checks, ValidationRegistry};

/// Minimum legal driver age.
const MIN_DRIVER_AGE: u32 = 18;

/// Licence expiry closer than this to the return date is flagged.
const LICENCE_EXPIRY_WARNING_DAYS: i64 = 30;

/// Rentals longer than this are flagged for review.
const LONG_RENTAL_DAYS: i64 = 365;

const LOW_FUEL_PERCENT: i32 = 25;

/// Step descriptors of the agreement wizard, in display order.
pub fn agreement_steps() -> Vec<StepConfig> {
    vec![
        StepConfig::new("source", "Agreement Source"),
        StepConfig::new("customer", "Customer"),
        StepConfig::new("vehicle", "Vehicle"),
        StepConfig::new("rental_period", "Rental Period"),
        StepConfig::new("drivers", "Drivers"),
        StepConfig::new("insurance", "Insurance"),
        StepConfig::new("addons", "Add-ons"),
        StepConfig::new("payment", "Payment"),
        StepConfig::new("review", "Review & Signature"),
    ]
}

/// Build the registry holding one rule per agreement step.
pub fn agreement_registry(config: &PricingConfig) -> ValidationRegistry<AgreementData> {
    let young_driver_age = config.young_driver_age;

    ValidationRegistry::new()
        .with_rule(validate_source)
        .with_rule(validate_customer)
        .with_rule(validate_vehicle)
        .with_rule(validate_rental_period)
        .with_rule(move |data: &AgreementData| validate_drivers(data, young_driver_age))
        .with_rule(validate_insurance)
        .with_rule(validate_addons)
        .with_rule(validate_payment)
        .with_rule(validate_review)
        // licence expiry is checked against the return date
        .with_dependency(CUSTOMER_STEP, RENTAL_PERIOD_STEP)
        // driver ages are taken at pickup
        .with_dependency(DRIVERS_STEP, RENTAL_PERIOD_STEP)
}

pub fn validate_source(data: &AgreementData) -> ValidationResult {
    let mut checks = Checks::new();
    match &data.source.source {
        None => checks.error("Please select an agreement source"),
        Some(AgreementSource::Reservation { reservation_id }) => {
            checks.require_text(Some(reservation_id.as_str()), "Please enter the reservation reference");
        }
        Some(AgreementSource::Direct) => {}
    }
    checks.finish()
}

pub fn validate_customer(data: &AgreementData) -> ValidationResult {
    let customer = &data.customer;
    let mut checks = Checks::new();
    checks.require_text(customer.customer_id.as_deref(), "Please select a customer");
    checks.require_text(
        customer.licence_number.as_deref(),
        "Driving licence number is required",
    );

    if let (Some(expires), Some(return_at)) =
        (customer.licence_expires_on, data.rental_period.return_at)
    {
        let return_date = return_at.date_naive();
        if expires < return_date {
            checks.error("Driving licence expires before the return date");
        } else if expires < return_date + Duration::days(LICENCE_EXPIRY_WARNING_DAYS) {
            checks.warn("Driving licence expires within 30 days of the return date");
        }
    }
    checks.finish()
}

pub fn validate_vehicle(data: &AgreementData) -> ValidationResult {
    let vehicle = &data.vehicle;
    let mut checks = Checks::new();
    checks.require_text(vehicle.vehicle_id.as_deref(), "Please select a vehicle");

    if let Some(fuel) = vehicle.fuel_level_percent {
        if !(0..=100).contains(&fuel) {
            checks.error("Fuel level must be between 0 and 100");
        } else if fuel < LOW_FUEL_PERCENT {
            checks.warn("Fuel level is below 25%");
        }
    }
    if vehicle.odometer_out.is_some_and(|km| km < 0) {
        checks.error("Odometer reading cannot be negative");
    }
    if has_negative_rate(&vehicle.rates, &vehicle.price_list_rates) {
        checks.error("Rates cannot be negative");
    }
    checks.finish()
}

pub fn validate_rental_period(data: &AgreementData) -> ValidationResult {
    let period = &data.rental_period;
    let mut checks = Checks::new();
    if period.pickup_at.is_none() {
        checks.error("Pickup date and time is required");
    }
    if period.return_at.is_none() {
        checks.error("Return date and time is required");
    }
    checks.require_text(period.pickup_location.as_deref(), "Pickup location is required");
    checks.require_text(period.return_location.as_deref(), "Return location is required");

    if let Some(range) = period.date_range() {
        if range.end <= range.start {
            checks.error("Return must be after pickup");
        } else if range.end - range.start > Duration::days(LONG_RENTAL_DAYS) {
            checks.warn("Rental period exceeds 365 days");
        }
    }
    checks.finish()
}

pub fn validate_drivers(data: &AgreementData, young_driver_age: u32) -> ValidationResult {
    let drivers = &data.drivers.drivers;
    let mut checks = Checks::new();
    if drivers.is_empty() {
        checks.error("At least one driver is required");
    }

    let as_of: Option<NaiveDate> = data.rental_period.pickup_at.map(|at| at.date_naive());
    for (position, driver) in drivers.iter().enumerate() {
        let number = position + 1;
        if driver.name.trim().is_empty() {
            checks.error(format!("Driver {number} name is required"));
        }
        let Some(dob) = driver.date_of_birth else {
            checks.error(format!("Driver {number} date of birth is required"));
            continue;
        };
        let Some(age) = as_of.and_then(|date| date.years_since(dob)) else {
            continue;
        };
        if age < MIN_DRIVER_AGE {
            checks.error(format!("Driver {number} must be at least {MIN_DRIVER_AGE} years old"));
        } else if age < young_driver_age {
            checks.warn(format!(
                "Driver {number} is under {young_driver_age}; the young driver fee applies"
            ));
        }
    }

    if drivers.iter().filter(|driver| driver.primary).count() > 1 {
        checks.error("Only one primary driver is allowed");
    }
    checks.finish()
}

pub fn validate_insurance(data: &AgreementData) -> ValidationResult {
    let insurance = &data.insurance;
    let mut checks = Checks::new();
    checks.require_text(insurance.coverage.as_deref(), "Please select an insurance option");
    if insurance.daily_charge < Decimal::ZERO {
        checks.error("Insurance charge cannot be negative");
    }
    if insurance.deductible < Decimal::ZERO {
        checks.error("Deductible cannot be negative");
    }
    checks.finish()
}

pub fn validate_addons(data: &AgreementData) -> ValidationResult {
    let mut checks = Checks::new();
    for (position, addon) in data.addons.addons.iter().enumerate() {
        if addon.name.trim().is_empty() {
            checks.error(format!("Add-on {} name is required", position + 1));
            continue;
        }
        if addon.quantity == 0 {
            checks.error(format!("Add-on '{}' quantity must be at least 1", addon.name));
        }
        if addon.unit_price < Decimal::ZERO {
            checks.error(format!("Add-on '{}' price cannot be negative", addon.name));
        }
    }
    checks.finish()
}

pub fn validate_payment(data: &AgreementData) -> ValidationResult {
    let payment = &data.payment;
    let mut checks = Checks::new();
    match payment.method {
        None => checks.error("Please select a payment method"),
        Some(PaymentMethod::Card) => {
            let valid_suffix = payment
                .card_last_four
                .as_deref()
                .is_some_and(|digits| digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()));
            if !valid_suffix {
                checks.error("Card payments require the last four card digits");
            }
        }
        Some(_) => {}
    }
    if payment.deposit < Decimal::ZERO {
        checks.error("Deposit cannot be negative");
    }
    if let Some(discount) = &payment.discount {
        if let Some(message) = discount_error(discount) {
            checks.error(message);
        }
    }
    checks.finish()
}

pub fn validate_review(data: &AgreementData) -> ValidationResult {
    let mut checks = Checks::new();
    if !data.review.terms_accepted {
        checks.error("Terms and conditions must be accepted");
    }
    if !data.review.signature_captured {
        checks.error("Customer signature is required");
    }
    checks.finish()
}

pub(crate) fn discount_error(discount: &Discount) -> Option<&'static str> {
    match discount {
        Discount::Percent(p) if *p < Decimal::ZERO || *p > Decimal::ONE_HUNDRED => {
            Some("Discount percentage must be between 0 and 100")
        }
        Discount::Amount(a) if *a < Decimal::ZERO => Some("Discount amount cannot be negative"),
        _ => None,
    }
}

pub(crate) fn has_negative_rate(context: &RateContext, fallback: &RateCard) -> bool {
    let panel = context.rates();
    [
        panel.hourly_rate,
        panel.daily_rate,
        panel.weekly_rate,
        panel.monthly_rate,
        context.kilometer_charge,
        fallback.hourly_rate,
        fallback.daily_rate,
        fallback.weekly_rate,
        fallback.monthly_rate,
    ]
    .iter()
    .any(|rate| *rate < Decimal::ZERO)
}
