//! Reservation Builder session.
//!
//! Wraps a [`BuilderSession`] with the pricing engine and a staleness
//! tracker. Lines are priced when they are added and repriced individually
//! when one of their own fields is edited. A rate context change never
//! reprices anything on its own: it raises a [`StalePricing`] signal, and the
//! operator either calls [`ReservationSession::reprice_all`] or dismisses it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fleetdesk_types::draft::DraftSnapshot;
use fleetdesk_types::pricing::{DateRange, Discount, Driver, PricedLine, RateCard, RateContext};
use fleetdesk_types::validation::ValidationResult;
use fleetdesk_types::reservation::{
    GENERAL_SECTION, LINES_SECTION, LinePrefill, NOTES_SECTION, RATES_SECTION, ReservationData,
    ReservationGeneral,
};

use super::session::{Advance, BuilderSession};
use crate::hash::ContentHasher;
use crate::pricing::{PricingEngine, PricingError, StalePricing, StalenessTracker, stale_line_ids};
use crate::progress::{ProgressError, ProgressTracker};
use crate::validation::reservation::{reservation_registry, reservation_sections};

/// One edit of the reservation builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum ReservationCommand {
    SetGeneral(ReservationGeneral),
    SetRateContext(RateContext),
    /// Select a price list: sets its id on the rate context and its rates as
    /// the fallback card.
    SetPriceList {
        price_list_id: Option<String>,
        rates: RateCard,
    },
    AddLine(LinePrefill),
    UpdateLineDates {
        line_id: Uuid,
        date_range: Option<DateRange>,
    },
    AssignDrivers {
        line_id: Uuid,
        drivers: Vec<Driver>,
    },
    SetLineDiscount {
        line_id: Uuid,
        discount: Option<Discount>,
    },
    SetLineInsurance {
        line_id: Uuid,
        insurance_daily: Decimal,
    },
    RemoveLine(Uuid),
    SetNotes(String),
}

impl ReservationCommand {
    pub fn section(&self) -> usize {
        match self {
            ReservationCommand::SetGeneral(_) => GENERAL_SECTION,
            ReservationCommand::SetRateContext(_) | ReservationCommand::SetPriceList { .. } => {
                RATES_SECTION
            }
            ReservationCommand::AddLine(_)
            | ReservationCommand::UpdateLineDates { .. }
            | ReservationCommand::AssignDrivers { .. }
            | ReservationCommand::SetLineDiscount { .. }
            | ReservationCommand::SetLineInsurance { .. }
            | ReservationCommand::RemoveLine(_) => LINES_SECTION,
            ReservationCommand::SetNotes(_) => NOTES_SECTION,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("line {0} not found")]
    LineNotFound(Uuid),
}

/// What applying a command changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub section: usize,
    /// Raised when this command changed the rate context while lines exist.
    pub stale: Option<StalePricing>,
}

pub struct ReservationSession<H: ContentHasher> {
    session: BuilderSession<ReservationData>,
    engine: PricingEngine<H>,
    staleness: StalenessTracker,
}

impl<H: ContentHasher> ReservationSession<H> {
    pub fn new(engine: PricingEngine<H>) -> Result<Self, ProgressError> {
        let data = ReservationData::default();
        let baseline = engine.context_hash(&data.rates);
        Ok(Self {
            session: BuilderSession::new(data, reservation_sections(), reservation_registry())?,
            engine,
            staleness: StalenessTracker::new(baseline),
        })
    }

    /// Resume from a snapshot. Lines priced against another context are
    /// reported by [`ReservationSession::stale_lines`].
    pub fn restore(
        snapshot: DraftSnapshot<ReservationData>,
        engine: PricingEngine<H>,
    ) -> Result<Self, ProgressError> {
        let baseline = engine.context_hash(&snapshot.wizard_data.rates);
        Ok(Self {
            session: BuilderSession::restore(snapshot, reservation_sections(), reservation_registry())?,
            engine,
            staleness: StalenessTracker::new(baseline),
        })
    }

    pub fn data(&self) -> &ReservationData {
        self.session.data()
    }

    pub fn progress(&self) -> &ProgressTracker {
        self.session.progress()
    }

    pub fn engine(&self) -> &PricingEngine<H> {
        &self.engine
    }

    /// Hash of the rate context as it is now.
    pub fn current_context_hash(&self) -> String {
        self.engine.context_hash(&self.data().rates)
    }

    pub fn pending_stale(&self) -> Option<&StalePricing> {
        self.staleness.pending()
    }

    /// Lines priced against a context other than the current one.
    pub fn stale_lines(&self) -> Vec<Uuid> {
        stale_line_ids(&self.data().lines, &self.current_context_hash())
    }

    /// Apply `command`. Pricing failures leave the data unchanged.
    pub fn apply(
        &mut self,
        command: ReservationCommand,
        now: DateTime<Utc>,
    ) -> Result<Applied, ReservationError> {
        let section = command.section();
        match command {
            ReservationCommand::SetGeneral(general) => {
                self.session.edit(|data| {
                    data.general = general;
                    GENERAL_SECTION
                })?;
            }
            ReservationCommand::SetRateContext(rates) => {
                self.session.edit(|data| {
                    data.rates = rates;
                    RATES_SECTION
                })?;
                return Ok(Applied {
                    section,
                    stale: self.observe_context(),
                });
            }
            ReservationCommand::SetPriceList { price_list_id, rates } => {
                self.session.edit(|data| {
                    data.rates.price_list_id = price_list_id;
                    data.price_list_rates = rates;
                    RATES_SECTION
                })?;
                return Ok(Applied {
                    section,
                    stale: self.observe_context(),
                });
            }
            ReservationCommand::AddLine(prefill) => {
                let data = self.session.data();
                let line = self
                    .engine
                    .create_line(&prefill, &data.rates, &data.price_list_rates, now)?;
                tracing::debug!(line_id = %line.id, vehicle = %line.vehicle_id, total = %line.line_total, "line added");
                self.session.edit(|data| {
                    data.lines.push(line);
                    LINES_SECTION
                })?;
            }
            ReservationCommand::UpdateLineDates { line_id, date_range } => {
                self.edit_line(line_id, |line| line.date_range = date_range)?;
            }
            ReservationCommand::AssignDrivers { line_id, drivers } => {
                self.edit_line(line_id, |line| line.drivers = drivers)?;
            }
            ReservationCommand::SetLineDiscount { line_id, discount } => {
                self.edit_line(line_id, |line| line.discount = discount)?;
            }
            ReservationCommand::SetLineInsurance { line_id, insurance_daily } => {
                self.edit_line(line_id, |line| line.insurance_daily = insurance_daily)?;
            }
            ReservationCommand::RemoveLine(line_id) => {
                if !self.data().lines.iter().any(|line| line.id == line_id) {
                    return Err(ReservationError::LineNotFound(line_id));
                }
                self.session.edit(|data| {
                    data.lines.retain(|line| line.id != line_id);
                    LINES_SECTION
                })?;
            }
            ReservationCommand::SetNotes(notes) => {
                self.session.edit(|data| {
                    data.notes = notes;
                    NOTES_SECTION
                })?;
            }
        }
        Ok(Applied { section, stale: None })
    }

    fn observe_context(&mut self) -> Option<StalePricing> {
        let hash = self.current_context_hash();
        let line_count = self.data().lines.len();
        self.staleness.observe(&hash, line_count)
    }

    /// Edit one line's own fields and reprice it against the current context.
    ///
    /// A line whose dates were cleared keeps its previous prices; the lines
    /// section then fails validation until dates are set again.
    fn edit_line<F>(&mut self, line_id: Uuid, edit: F) -> Result<(), ReservationError>
    where
        F: FnOnce(&mut PricedLine),
    {
        let data = self.session.data();
        let mut line = data
            .lines
            .iter()
            .find(|line| line.id == line_id)
            .cloned()
            .ok_or(ReservationError::LineNotFound(line_id))?;
        edit(&mut line);

        if line.date_range.is_some() {
            let hash = self.engine.context_hash(&data.rates);
            line = self
                .engine
                .reprice_line(&line, &data.rates, &hash, &data.price_list_rates)?;
        }

        self.session.edit(|data| {
            if let Some(slot) = data.lines.iter_mut().find(|slot| slot.id == line_id) {
                *slot = line;
            }
            LINES_SECTION
        })?;
        Ok(())
    }

    /// Reprice every line against the current context on operator request.
    ///
    /// Returns the number of lines whose prices changed. Lines are left
    /// untouched when nothing changed, so the section keeps its status.
    pub fn reprice_all(&mut self) -> Result<usize, ProgressError> {
        let hash = self.current_context_hash();
        let data = self.session.data();
        let repriced = self.engine.reprice(&data.lines, &data.rates, &data.price_list_rates);
        let changed = repriced
            .iter()
            .zip(&data.lines)
            .filter(|(new, old)| new != old)
            .count();

        if changed > 0 {
            self.session.edit(|data| {
                data.lines = repriced;
                LINES_SECTION
            })?;
        }
        self.staleness.acknowledge_reprice(&hash);
        tracing::info!(changed, "reservation lines repriced");
        Ok(changed)
    }

    /// Keep existing prices and clear the stale signal.
    pub fn dismiss_stale(&mut self) -> Option<StalePricing> {
        self.staleness.dismiss()
    }

    pub fn jump_to(&mut self, section: usize) -> Result<(), ProgressError> {
        self.session.jump_to(section)
    }

    pub fn advance(&mut self) -> Result<Advance, ProgressError> {
        self.session.advance()
    }

    pub fn validate_section(&mut self, section: usize) -> Result<ValidationResult, ProgressError> {
        self.session.validate_step(section)
    }

    pub fn validate_all(&mut self) -> Result<Vec<ValidationResult>, ProgressError> {
        self.session.validate_all()
    }

    pub fn submit(&self) -> Result<(), ProgressError> {
        self.session.submit()
    }

    pub fn snapshot_for_save(&mut self, now: DateTime<Utc>) -> DraftSnapshot<ReservationData> {
        self.session.snapshot_for_save(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::test_support::PlainHasher;
    use fleetdesk_types::config::PricingConfig;
    use fleetdesk_types::progress::StepStatus;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn session() -> ReservationSession<PlainHasher> {
        ReservationSession::new(PricingEngine::new(PricingConfig::default(), PlainHasher)).unwrap()
    }

    fn daily(rate: Decimal) -> RateContext {
        RateContext {
            daily_rate: rate,
            ..Default::default()
        }
    }

    fn prefill(vehicle: &str) -> LinePrefill {
        LinePrefill {
            vehicle_id: Some(vehicle.to_string()),
            pickup_at: Some(at("2026-07-01T10:00:00Z")),
            return_at: Some(at("2026-07-02T11:00:00Z")),
            pickup_location: Some("Airport".to_string()),
            return_location: Some("Station".to_string()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        at("2026-06-15T12:00:00Z")
    }

    #[test]
    fn test_rate_change_without_lines_never_signals() {
        let mut session = session();
        let applied = session
            .apply(ReservationCommand::SetRateContext(daily(dec!(50))), now())
            .unwrap();
        assert_eq!(applied.section, RATES_SECTION);
        assert!(applied.stale.is_none());
        assert!(session.pending_stale().is_none());
    }

    #[test]
    fn test_rate_change_with_lines_signals_once_and_keeps_prices() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        assert_eq!(session.data().lines[0].base_price, dec!(100));

        let changed = RateContext {
            daily_rate: dec!(50),
            kilometer_charge: dec!(0.30),
            ..Default::default()
        };
        let applied = session
            .apply(ReservationCommand::SetRateContext(changed.clone()), now())
            .unwrap();
        assert_eq!(applied.stale.unwrap().line_count, 1);

        let again = session.apply(ReservationCommand::SetRateContext(changed), now()).unwrap();
        assert!(again.stale.is_none());

        assert_eq!(session.data().lines[0].base_price, dec!(100));
        assert_eq!(session.stale_lines(), vec![session.data().lines[0].id]);
    }

    #[test]
    fn test_reprice_all_clears_signal_and_stale_lines() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(70))), now()).unwrap();

        assert_eq!(session.reprice_all().unwrap(), 1);
        assert!(session.pending_stale().is_none());
        assert!(session.stale_lines().is_empty());
        assert_eq!(session.data().lines[0].base_price, dec!(140));
        assert_eq!(session.reprice_all().unwrap(), 0);
    }

    #[test]
    fn test_dismiss_keeps_prices() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(70))), now()).unwrap();

        assert!(session.dismiss_stale().is_some());
        assert!(session.pending_stale().is_none());
        assert_eq!(session.data().lines[0].base_price, dec!(100));
    }

    #[test]
    fn test_incomplete_prefill_adds_nothing() {
        let mut session = session();
        let mut partial = prefill("CAR-1");
        partial.return_location = None;
        let err = session.apply(ReservationCommand::AddLine(partial), now()).unwrap_err();
        assert!(matches!(err, ReservationError::Pricing(PricingError::IncompletePrefill { .. })));
        assert!(session.data().lines.is_empty());
    }

    #[test]
    fn test_line_edit_reprices_that_line() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        let id = session.data().lines[0].id;

        session
            .apply(
                ReservationCommand::SetLineDiscount {
                    line_id: id,
                    discount: Some(Discount::Amount(dec!(20))),
                },
                now(),
            )
            .unwrap();
        let line = &session.data().lines[0];
        assert_eq!(line.base_price, dec!(80));
        assert_eq!(line.tax_value, dec!(8));
        assert_eq!(line.line_total, dec!(88));

        let longer = DateRange::new(at("2026-07-01T10:00:00Z"), at("2026-07-04T10:00:00Z"));
        session
            .apply(
                ReservationCommand::UpdateLineDates {
                    line_id: id,
                    date_range: Some(longer),
                },
                now(),
            )
            .unwrap();
        assert_eq!(session.data().lines[0].base_price, dec!(130));
    }

    #[test]
    fn test_invalid_dates_leave_line_unchanged() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        let before = session.data().lines[0].clone();

        let reversed = DateRange::new(at("2026-07-04T10:00:00Z"), at("2026-07-01T10:00:00Z"));
        let err = session
            .apply(
                ReservationCommand::UpdateLineDates {
                    line_id: before.id,
                    date_range: Some(reversed),
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, ReservationError::Pricing(PricingError::InvalidRange)));
        assert_eq!(session.data().lines[0], before);
    }

    #[test]
    fn test_unknown_line_rejected() {
        let mut session = session();
        let err = session
            .apply(ReservationCommand::RemoveLine(Uuid::nil()), now())
            .unwrap_err();
        assert!(matches!(err, ReservationError::LineNotFound(_)));
    }

    #[test]
    fn test_full_reservation_submits() {
        let mut session = session();
        session
            .apply(
                ReservationCommand::SetGeneral(ReservationGeneral {
                    customer_id: Some("C-4".to_string()),
                    reference: None,
                }),
                now(),
            )
            .unwrap();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();

        let results = session.validate_all().unwrap();
        assert!(results.iter().all(|result| result.is_valid), "{results:?}");
        assert!(session.submit().is_ok());

        session.apply(ReservationCommand::SetNotes("Late arrival".to_string()), now()).unwrap();
        assert_eq!(session.progress().step_status(NOTES_SECTION), Some(StepStatus::Incomplete));
        assert!(session.submit().is_err());
    }

    #[test]
    fn test_restore_reports_lines_priced_elsewhere() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        let mut snapshot = session.snapshot_for_save(now());
        snapshot.wizard_data.rates.daily_rate = dec!(90);

        let engine = PricingEngine::new(PricingConfig::default(), PlainHasher);
        let restored = ReservationSession::restore(snapshot, engine).unwrap();
        assert_eq!(restored.stale_lines().len(), 1);
        assert!(restored.pending_stale().is_none());
    }

    #[test]
    fn test_reprice_without_price_changes_keeps_lines_validated() {
        let mut session = session();
        session.apply(ReservationCommand::SetRateContext(daily(dec!(50))), now()).unwrap();
        session.apply(ReservationCommand::AddLine(prefill("CAR-1")), now()).unwrap();
        assert!(session.validate_section(LINES_SECTION).unwrap().is_valid);
        assert_eq!(session.progress().step_status(LINES_SECTION), Some(StepStatus::Complete));

        assert_eq!(session.reprice_all().unwrap(), 0);
        assert_eq!(session.progress().step_status(LINES_SECTION), Some(StepStatus::Complete));
        assert!(session.pending_stale().is_none());
    }
}
