//! Generic builder session: data, progress and rules of one builder instance.
//!
//! A session is constructed per builder and owns the single in-memory copy
//! of the data. Every validation runs against the data as it is at the moment
//! of the call, so a transition can never act on an outdated snapshot.

use chrono::{DateTime, Utc};

use fleetdesk_types::draft::DraftSnapshot;
use fleetdesk_types::progress::StepConfig;
use fleetdesk_types::validation::ValidationResult;

use crate::progress::{ProgressError, ProgressTracker};
use crate::validation::ValidationRegistry;

/// Result of trying to move past the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The step validated and the pointer moved to `to`.
    Moved { to: usize },
    /// The last step validated; nothing left to move to.
    Finished,
    /// Validation failed; the step is now `HasErrors`.
    Blocked(ValidationResult),
}

pub struct BuilderSession<D> {
    data: D,
    progress: ProgressTracker,
    registry: ValidationRegistry<D>,
}

impl<D> BuilderSession<D> {
    pub fn new(
        data: D,
        steps: Vec<StepConfig>,
        registry: ValidationRegistry<D>,
    ) -> Result<Self, ProgressError> {
        Ok(Self {
            data,
            progress: ProgressTracker::new(steps)?,
            registry,
        })
    }

    /// Resume a session from a persisted snapshot.
    pub fn restore(
        snapshot: DraftSnapshot<D>,
        steps: Vec<StepConfig>,
        registry: ValidationRegistry<D>,
    ) -> Result<Self, ProgressError> {
        Ok(Self {
            data: snapshot.wizard_data,
            progress: ProgressTracker::from_state(steps, snapshot.progress)?,
            registry,
        })
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Mutate the data. `edit` returns the step whose data it touched, which
    /// drops back to `Incomplete` together with every validated step whose
    /// rule reads that data.
    pub fn edit<F>(&mut self, edit: F) -> Result<usize, ProgressError>
    where
        F: FnOnce(&mut D) -> usize,
    {
        let step = edit(&mut self.data);
        self.progress.note_step_edited(step)?;
        for dependent in self.registry.dependents_of(step) {
            self.progress.invalidate_step(dependent)?;
        }
        Ok(step)
    }

    /// Make `step` current. Never blocked by step statuses.
    pub fn jump_to(&mut self, step: usize) -> Result<(), ProgressError> {
        self.progress.set_current_step(step)
    }

    /// Move to the previous step, if any.
    pub fn back(&mut self) -> Result<usize, ProgressError> {
        let target = self.progress.current_step().saturating_sub(1);
        self.progress.set_current_step(target)?;
        Ok(target)
    }

    /// Validate `step` against current data and record the outcome.
    pub fn validate_step(&mut self, step: usize) -> Result<ValidationResult, ProgressError> {
        let result = self.registry.validate(step, &self.data);
        self.progress.record_validation(step, &result)?;
        Ok(result)
    }

    /// Validate the current step and move forward when it passes.
    pub fn advance(&mut self) -> Result<Advance, ProgressError> {
        let current = self.progress.current_step();
        let result = self.validate_step(current)?;
        if !result.is_valid {
            return Ok(Advance::Blocked(result));
        }

        let next = current + 1;
        if next < self.progress.total_steps() {
            self.progress.set_current_step(next)?;
            Ok(Advance::Moved { to: next })
        } else {
            Ok(Advance::Finished)
        }
    }

    /// Validate every step, recording each outcome.
    pub fn validate_all(&mut self) -> Result<Vec<ValidationResult>, ProgressError> {
        (0..self.progress.total_steps())
            .map(|step| self.validate_step(step))
            .collect()
    }

    /// Submission gate: fails naming every step that is not complete.
    pub fn submit(&self) -> Result<(), ProgressError> {
        self.progress.check_submission()
    }
}

impl<D: Clone> BuilderSession<D> {
    pub fn snapshot(&self) -> DraftSnapshot<D> {
        DraftSnapshot {
            wizard_data: self.data.clone(),
            progress: self.progress.state().clone(),
        }
    }

    /// Stamp `last_saved_at` and return the snapshot to persist.
    pub fn snapshot_for_save(&mut self, now: DateTime<Utc>) -> DraftSnapshot<D> {
        self.progress.mark_saved(now);
        self.snapshot()
    }
}
