//! Rule set of the Reservation Builder sections.

use rust_decimal::Decimal;

use fleetdesk_types::progress::StepConfig;
use fleetdesk_types::reservation::ReservationData;
use fleetdesk_types::validation::ValidationResult;

use super::agreement::{discount_error, has_negative_rate};
use super::{Checks, ValidationRegistry};

const MAX_NOTES_CHARS: usize = 2000;

/// Section descriptors of the reservation builder, in display order.
pub fn reservation_sections() -> Vec<StepConfig> {
    vec![
        StepConfig::new("general", "General"),
        StepConfig::new("rates", "Rates"),
        StepConfig::new("lines", "Vehicles"),
        StepConfig::new("notes", "Notes"),
    ]
}

/// Build the registry holding one rule per reservation section.
pub fn reservation_registry() -> ValidationRegistry<ReservationData> {
    ValidationRegistry::new()
        .with_rule(validate_general)
        .with_rule(validate_rates)
        .with_rule(validate_lines)
        .with_rule(validate_notes)
}

pub fn validate_general(data: &ReservationData) -> ValidationResult {
    let mut checks = Checks::new();
    checks.require_text(data.general.customer_id.as_deref(), "Please select a customer");
    checks.finish()
}

pub fn validate_rates(data: &ReservationData) -> ValidationResult {
    let rates = &data.rates;
    let mut checks = Checks::new();
    if has_negative_rate(rates, &data.price_list_rates) {
        checks.error("Rates cannot be negative");
    }

    let panel = rates.rates();
    let all_zero = [
        panel.hourly_rate,
        panel.daily_rate,
        panel.weekly_rate,
        panel.monthly_rate,
        data.price_list_rates.hourly_rate,
        data.price_list_rates.daily_rate,
        data.price_list_rates.weekly_rate,
        data.price_list_rates.monthly_rate,
    ]
    .iter()
    .all(|rate| rate.is_zero());
    if all_zero {
        checks.warn("No rates are set; lines will be priced at zero");
    }
    if rates.promotion_code.as_deref().is_some_and(|c| !c.trim().is_empty())
        && rates.price_list_id.as_deref().is_none_or(|p| p.trim().is_empty())
    {
        checks.warn("Promotion code has no effect without a price list");
    }
    checks.finish()
}

pub fn validate_lines(data: &ReservationData) -> ValidationResult {
    let mut checks = Checks::new();
    if data.lines.is_empty() {
        checks.error("Add at least one vehicle");
    }

    for (position, line) in data.lines.iter().enumerate() {
        let number = position + 1;
        match line.date_range {
            None => checks.error(format!("Vehicle {number} ({}) has no rental dates", line.vehicle_id)),
            Some(range) if range.end <= range.start => checks.error(format!(
                "Vehicle {number} ({}): return must be after pickup",
                line.vehicle_id
            )),
            Some(_) => {}
        }
        if let Some(message) = line.discount.as_ref().and_then(discount_error) {
            checks.error(format!("Vehicle {number} ({}): {message}", line.vehicle_id));
        }
        if line.insurance_daily < Decimal::ZERO {
            checks.error(format!(
                "Vehicle {number} ({}): insurance charge cannot be negative",
                line.vehicle_id
            ));
        }
    }
    checks.finish()
}

pub fn validate_notes(data: &ReservationData) -> ValidationResult {
    let mut checks = Checks::new();
    if data.notes.chars().count() > MAX_NOTES_CHARS {
        checks.warn("Notes are longer than 2000 characters and may be truncated on print");
    }
    checks.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use fleetdesk_types::pricing::{DateRange, Discount, PriceSource, PricedLine};
    use fleetdesk_types::reservation::{RESERVATION_SECTION_COUNT, LINES_SECTION};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn line(vehicle: &str, range: Option<DateRange>) -> PricedLine {
        PricedLine {
            id: Uuid::now_v7(),
            vehicle_id: vehicle.to_string(),
            pickup_location: "Airport".to_string(),
            return_location: "Airport".to_string(),
            date_range: range,
            drivers: Vec::new(),
            discount: None,
            insurance_daily: Decimal::ZERO,
            base_price: dec!(100),
            tax_value: dec!(10),
            line_total: dec!(110),
            price_source: PriceSource::Panel,
            rate_context_hash_at_pricing: "h".to_string(),
            created_at: at("2026-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn test_registry_covers_every_section() {
        assert_eq!(reservation_registry().len(), RESERVATION_SECTION_COUNT);
        assert_eq!(reservation_sections().len(), RESERVATION_SECTION_COUNT);
    }

    #[test]
    fn test_general_requires_customer() {
        let mut data = ReservationData::default();
        assert_eq!(validate_general(&data).errors, vec!["Please select a customer"]);
        data.general.customer_id = Some("C-9".to_string());
        assert!(validate_general(&data).is_valid);
    }

    #[test]
    fn test_zero_rates_warn_only() {
        let data = ReservationData::default();
        let result = validate_rates(&data);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_promotion_without_price_list_warns() {
        let mut data = ReservationData::default();
        data.rates.daily_rate = dec!(40);
        data.rates.promotion_code = Some("SPRING".to_string());
        let result = validate_rates(&data);
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["Promotion code has no effect without a price list"]);
    }

    #[test]
    fn test_lines_section_names_offending_lines() {
        let mut data = ReservationData::default();
        let result = reservation_registry().validate(LINES_SECTION, &data);
        assert_eq!(result.errors, vec!["Add at least one vehicle"]);

        let good = DateRange::new(at("2026-02-01T10:00:00Z"), at("2026-02-03T10:00:00Z"));
        let reversed = DateRange::new(at("2026-02-03T10:00:00Z"), at("2026-02-01T10:00:00Z"));
        data.lines = vec![line("CAR-1", Some(good)), line("CAR-2", None), line("VAN-3", Some(reversed))];
        data.lines[0].discount = Some(Discount::Amount(dec!(-3)));

        let errors = validate_lines(&data).errors;
        assert_eq!(
            errors,
            vec![
                "Vehicle 1 (CAR-1): Discount amount cannot be negative",
                "Vehicle 2 (CAR-2) has no rental dates",
                "Vehicle 3 (VAN-3): return must be after pickup",
            ]
        );
    }

    #[test]
    fn test_notes_length_warning() {
        let mut data = ReservationData::default();
        assert!(validate_notes(&data).warnings.is_empty());
        data.notes = "x".repeat(2001);
        let result = validate_notes(&data);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
