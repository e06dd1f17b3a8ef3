//! Agreement Wizard session: typed update commands and their reducer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fleetdesk_types::agreement::{
    Addon, AgreementData, AgreementSource, CustomerStep, InsuranceStep, PaymentStep,
    RentalPeriodStep, VehicleStep, ADDONS_STEP, CUSTOMER_STEP, DRIVERS_STEP, INSURANCE_STEP,
    PAYMENT_STEP, RENTAL_PERIOD_STEP, REVIEW_STEP, SOURCE_STEP, VEHICLE_STEP,
};
use fleetdesk_types::config::PricingConfig;
use fleetdesk_types::draft::DraftSnapshot;
use fleetdesk_types::pricing::{Discount, Driver};

use super::session::BuilderSession;
use crate::progress::ProgressError;
use crate::validation::agreement::{agreement_registry, agreement_steps};

pub type AgreementSession = BuilderSession<AgreementData>;

/// One edit of the agreement wizard, carrying its own typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum AgreementCommand {
    SetSource(Option<AgreementSource>),
    SetCustomer(CustomerStep),
    SetVehicle(VehicleStep),
    SetRentalPeriod(RentalPeriodStep),
    AddDriver(Driver),
    /// Remove the driver at this position; out-of-range positions are ignored.
    RemoveDriver(usize),
    SetPrimaryDriver(usize),
    SetInsurance(InsuranceStep),
    AddAddon(Addon),
    RemoveAddon(usize),
    SetAddonQuantity { index: usize, quantity: u32 },
    SetPayment(PaymentStep),
    SetDeposit(Decimal),
    SetDiscount(Option<Discount>),
    AcceptTerms(bool),
    CaptureSignature(bool),
}

impl AgreementCommand {
    /// The step whose data this command edits.
    pub fn step(&self) -> usize {
        match self {
            AgreementCommand::SetSource(_) => SOURCE_STEP,
            AgreementCommand::SetCustomer(_) => CUSTOMER_STEP,
            AgreementCommand::SetVehicle(_) => VEHICLE_STEP,
            AgreementCommand::SetRentalPeriod(_) => RENTAL_PERIOD_STEP,
            AgreementCommand::AddDriver(_)
            | AgreementCommand::RemoveDriver(_)
            | AgreementCommand::SetPrimaryDriver(_) => DRIVERS_STEP,
            AgreementCommand::SetInsurance(_) => INSURANCE_STEP,
            AgreementCommand::AddAddon(_)
            | AgreementCommand::RemoveAddon(_)
            | AgreementCommand::SetAddonQuantity { .. } => ADDONS_STEP,
            AgreementCommand::SetPayment(_)
            | AgreementCommand::SetDeposit(_)
            | AgreementCommand::SetDiscount(_) => PAYMENT_STEP,
            AgreementCommand::AcceptTerms(_) | AgreementCommand::CaptureSignature(_) => REVIEW_STEP,
        }
    }
}

/// Apply `command` to `data`, returning the edited step.
pub fn reduce_agreement(data: &mut AgreementData, command: AgreementCommand) -> usize {
    let step = command.step();
    match command {
        AgreementCommand::SetSource(source) => data.source.source = source,
        AgreementCommand::SetCustomer(customer) => data.customer = customer,
        AgreementCommand::SetVehicle(vehicle) => data.vehicle = vehicle,
        AgreementCommand::SetRentalPeriod(period) => data.rental_period = period,
        AgreementCommand::AddDriver(driver) => data.drivers.drivers.push(driver),
        AgreementCommand::RemoveDriver(index) => {
            if index < data.drivers.drivers.len() {
                data.drivers.drivers.remove(index);
            }
        }
        AgreementCommand::SetPrimaryDriver(index) => {
            for (position, driver) in data.drivers.drivers.iter_mut().enumerate() {
                driver.primary = position == index;
            }
        }
        AgreementCommand::SetInsurance(insurance) => data.insurance = insurance,
        AgreementCommand::AddAddon(addon) => data.addons.addons.push(addon),
        AgreementCommand::RemoveAddon(index) => {
            if index < data.addons.addons.len() {
                data.addons.addons.remove(index);
            }
        }
        AgreementCommand::SetAddonQuantity { index, quantity } => {
            if let Some(addon) = data.addons.addons.get_mut(index) {
                addon.quantity = quantity;
            }
        }
        AgreementCommand::SetPayment(payment) => data.payment = payment,
        AgreementCommand::SetDeposit(deposit) => data.payment.deposit = deposit,
        AgreementCommand::SetDiscount(discount) => data.payment.discount = discount,
        AgreementCommand::AcceptTerms(accepted) => data.review.terms_accepted = accepted,
        AgreementCommand::CaptureSignature(captured) => data.review.signature_captured = captured,
    }
    step
}

/// Fresh agreement wizard positioned on the source step.
pub fn new_agreement_session(config: &PricingConfig) -> Result<AgreementSession, ProgressError> {
    BuilderSession::new(AgreementData::default(), agreement_steps(), agreement_registry(config))
}

pub fn restore_agreement_session(
    snapshot: DraftSnapshot<AgreementData>,
    config: &PricingConfig,
) -> Result<AgreementSession, ProgressError> {
    BuilderSession::restore(snapshot, agreement_steps(), agreement_registry(config))
}

impl BuilderSession<AgreementData> {
    /// Apply a command and demote the step it edited.
    pub fn apply(&mut self, command: AgreementCommand) -> Result<usize, ProgressError> {
        self.edit(|data| reduce_agreement(data, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::session::Advance;
    use chrono::{DateTime, NaiveDate, Utc};
    use fleetdesk_types::agreement::{PaymentMethod, AGREEMENT_STEP_COUNT};
    use fleetdesk_types::progress::StepStatus;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn driver(name: &str, dob: &str, primary: bool) -> Driver {
        Driver {
            name: name.to_string(),
            date_of_birth: Some(NaiveDate::parse_from_str(dob, "%Y-%m-%d").unwrap()),
            primary,
        }
    }

    /// Every command needed to complete all nine steps.
    fn complete_agreement() -> Vec<AgreementCommand> {
        vec![
            AgreementCommand::SetSource(Some(AgreementSource::Direct)),
            AgreementCommand::SetCustomer(CustomerStep {
                customer_id: Some("C-1".to_string()),
                licence_number: Some("DL-778".to_string()),
                licence_expires_on: NaiveDate::from_ymd_opt(2030, 1, 1),
            }),
            AgreementCommand::SetVehicle(VehicleStep {
                vehicle_id: Some("CAR-1".to_string()),
                odometer_out: Some(12_000),
                fuel_level_percent: Some(80),
                ..Default::default()
            }),
            AgreementCommand::SetRentalPeriod(RentalPeriodStep {
                pickup_at: Some(at("2026-06-01T09:00:00Z")),
                return_at: Some(at("2026-06-04T09:00:00Z")),
                pickup_location: Some("Airport".to_string()),
                return_location: Some("Airport".to_string()),
            }),
            AgreementCommand::AddDriver(driver("Pat Lee", "1985-02-03", true)),
            AgreementCommand::SetInsurance(InsuranceStep {
                coverage: Some("basic".to_string()),
                daily_charge: dec!(9),
                deductible: dec!(500),
            }),
            AgreementCommand::AddAddon(Addon {
                name: "GPS".to_string(),
                quantity: 1,
                unit_price: dec!(12),
            }),
            AgreementCommand::SetPayment(PaymentStep {
                method: Some(PaymentMethod::Cash),
                deposit: dec!(200),
                ..Default::default()
            }),
            AgreementCommand::AcceptTerms(true),
            AgreementCommand::CaptureSignature(true),
        ]
    }

    #[test]
    fn test_every_command_names_its_step() {
        assert_eq!(AgreementCommand::AcceptTerms(true).step(), REVIEW_STEP);
        assert_eq!(AgreementCommand::RemoveAddon(0).step(), ADDONS_STEP);
        assert_eq!(AgreementCommand::SetDiscount(None).step(), PAYMENT_STEP);
    }

    #[test]
    fn test_reducer_ignores_out_of_range_positions() {
        let mut data = AgreementData::default();
        reduce_agreement(&mut data, AgreementCommand::AddDriver(driver("A", "1980-01-01", false)));
        reduce_agreement(&mut data, AgreementCommand::RemoveDriver(5));
        assert_eq!(data.drivers.drivers.len(), 1);

        reduce_agreement(&mut data, AgreementCommand::AddDriver(driver("B", "1981-01-01", false)));
        reduce_agreement(&mut data, AgreementCommand::SetPrimaryDriver(1));
        assert!(!data.drivers.drivers[0].primary);
        assert!(data.drivers.drivers[1].primary);
    }

    #[test]
    fn test_commands_deserialize_from_tagged_json() {
        let json = r#"{"command":"accept_terms","payload":true}"#;
        let command: AgreementCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, AgreementCommand::AcceptTerms(true));
    }

    #[test]
    fn test_full_walk_through_submits() {
        let mut session = new_agreement_session(&PricingConfig::default()).unwrap();
        for command in complete_agreement() {
            session.apply(command).unwrap();
        }

        for step in 0..AGREEMENT_STEP_COUNT {
            let outcome = session.advance().unwrap();
            match outcome {
                Advance::Blocked(result) => panic!("step {step} blocked: {:?}", result.errors),
                Advance::Moved { to } => assert_eq!(to, step + 1),
                Advance::Finished => assert_eq!(step, AGREEMENT_STEP_COUNT - 1),
            }
        }
        assert_eq!(session.progress().progress_percentage(), 100);
        assert!(session.submit().is_ok());
    }

    #[test]
    fn test_jump_ahead_then_edit_earlier_step() {
        let mut session = new_agreement_session(&PricingConfig::default()).unwrap();
        for command in complete_agreement() {
            session.apply(command).unwrap();
        }
        session.validate_all().unwrap();
        assert!(session.submit().is_ok());

        session.jump_to(REVIEW_STEP).unwrap();
        session.apply(AgreementCommand::SetSource(None)).unwrap();
        assert_eq!(session.progress().step_status(SOURCE_STEP), Some(StepStatus::Incomplete));

        let err = session.submit().unwrap_err();
        assert_eq!(
            err,
            ProgressError::SubmissionBlocked {
                steps: vec!["Agreement Source".to_string()]
            }
        );
    }

    #[test]
    fn test_rental_period_edit_reopens_steps_that_read_it() {
        let mut session = new_agreement_session(&PricingConfig::default()).unwrap();
        for command in complete_agreement() {
            session.apply(command).unwrap();
        }
        session
            .apply(AgreementCommand::SetCustomer(CustomerStep {
                customer_id: Some("C-1".to_string()),
                licence_number: Some("DL-778".to_string()),
                licence_expires_on: NaiveDate::from_ymd_opt(2026, 6, 10),
            }))
            .unwrap();
        session.validate_all().unwrap();
        assert!(session.submit().is_ok());

        session
            .apply(AgreementCommand::SetRentalPeriod(RentalPeriodStep {
                pickup_at: Some(at("2026-06-01T09:00:00Z")),
                return_at: Some(at("2026-08-01T09:00:00Z")),
                pickup_location: Some("Airport".to_string()),
                return_location: Some("Airport".to_string()),
            }))
            .unwrap();
        session.validate_step(RENTAL_PERIOD_STEP).unwrap();

        assert_eq!(session.progress().step_status(CUSTOMER_STEP), Some(StepStatus::Incomplete));
        assert_eq!(session.progress().step_status(DRIVERS_STEP), Some(StepStatus::Incomplete));
        assert_eq!(session.progress().step_status(VEHICLE_STEP), Some(StepStatus::Complete));
        let err = session.submit().unwrap_err();
        assert_eq!(
            err,
            ProgressError::SubmissionBlocked {
                steps: vec!["Customer".to_string(), "Drivers".to_string()]
            }
        );

        let result = session.validate_step(CUSTOMER_STEP).unwrap();
        assert_eq!(result.errors, vec!["Driving licence expires before the return date"]);
        assert_eq!(session.progress().step_status(CUSTOMER_STEP), Some(StepStatus::HasErrors));
    }
}
