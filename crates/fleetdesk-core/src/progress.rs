//! Step progress state machine and submission gate.
//!
//! `ProgressTracker` records validation outcomes; it holds no validation
//! logic of its own. Statuses move
//! `NotVisited -> Incomplete -> HasErrors <-> Complete`, and editing a
//! validated step sends it back to `Incomplete`.
//!
//! Navigation is never blocked: any valid step index can be made current
//! regardless of the status of the current or target step. Completeness is
//! reconciled only at submission, where every step must be `Complete`.

use chrono::{DateTime, Utc};

use fleetdesk_types::progress::{ProgressState, StepConfig, StepStatus};
use fleetdesk_types::validation::ValidationResult;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("a builder needs at least one step")]
    NoSteps,

    #[error("step {index} is out of range ({total} steps)")]
    StepOutOfRange { index: usize, total: usize },

    #[error("saved progress does not match the {expected} configured steps")]
    StateMismatch { expected: usize },

    /// Names every step that is not complete, in step order.
    #[error("cannot submit, incomplete steps: {}", steps.join(", "))]
    SubmissionBlocked { steps: Vec<String> },
}

/// Progress of one builder session over an ordered list of steps.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    steps: Vec<StepConfig>,
    state: ProgressState,
}

impl ProgressTracker {
    /// Fresh progress positioned on the first step.
    pub fn new(steps: Vec<StepConfig>) -> Result<Self, ProgressError> {
        if steps.is_empty() {
            return Err(ProgressError::NoSteps);
        }
        let state = ProgressState::new(steps.len());
        Ok(Self { steps, state })
    }

    /// Resume from a persisted state.
    ///
    /// The state must carry exactly one status per step and a current step
    /// within range. `can_proceed` is re-derived from the current step's
    /// status rather than trusted.
    pub fn from_state(steps: Vec<StepConfig>, mut state: ProgressState) -> Result<Self, ProgressError> {
        if steps.is_empty() {
            return Err(ProgressError::NoSteps);
        }
        let total = steps.len();
        let keys_match = state.statuses.len() == total && state.statuses.keys().copied().eq(0..total);
        if !keys_match || state.current_step >= total {
            return Err(ProgressError::StateMismatch { expected: total });
        }

        state.can_proceed = state.statuses.get(&state.current_step) == Some(&StepStatus::Complete);
        Ok(Self { steps, state })
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn can_proceed(&self) -> bool {
        self.state.can_proceed
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.state.last_saved_at
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn step_status(&self, index: usize) -> Option<StepStatus> {
        self.state.statuses.get(&index).copied()
    }

    fn check_index(&self, index: usize) -> Result<(), ProgressError> {
        if index < self.steps.len() {
            Ok(())
        } else {
            Err(ProgressError::StepOutOfRange {
                index,
                total: self.steps.len(),
            })
        }
    }

    fn set_status(&mut self, index: usize, status: StepStatus) {
        let previous = self.state.statuses.insert(index, status);
        if index == self.state.current_step {
            self.state.can_proceed = status == StepStatus::Complete;
        }
        if previous != Some(status) {
            tracing::debug!(step = index, from = ?previous, to = %status, "step status changed");
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Move the pointer to `index`. Succeeds for every valid index.
    ///
    /// An unvisited target becomes `Incomplete`.
    pub fn set_current_step(&mut self, index: usize) -> Result<(), ProgressError> {
        self.check_index(index)?;
        self.state.current_step = index;
        if self.step_status(index) == Some(StepStatus::NotVisited) {
            self.state.statuses.insert(index, StepStatus::Incomplete);
        }
        self.state.can_proceed = self.step_status(index) == Some(StepStatus::Complete);
        tracing::debug!(step = index, "current step changed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------

    /// Record that the step's validation passed.
    pub fn mark_step_complete(&mut self, index: usize) -> Result<(), ProgressError> {
        self.check_index(index)?;
        self.set_status(index, StepStatus::Complete);
        Ok(())
    }

    /// Record that the step has not been validated or is partly filled.
    pub fn mark_step_incomplete(&mut self, index: usize) -> Result<(), ProgressError> {
        self.check_index(index)?;
        self.set_status(index, StepStatus::Incomplete);
        Ok(())
    }

    /// Direct status override, used to mark `HasErrors` distinctly from
    /// `Incomplete`.
    pub fn update_step_status(&mut self, index: usize, status: StepStatus) -> Result<(), ProgressError> {
        self.check_index(index)?;
        self.set_status(index, status);
        Ok(())
    }

    /// Record the outcome of validating `index` against current data.
    pub fn record_validation(
        &mut self,
        index: usize,
        result: &ValidationResult,
    ) -> Result<StepStatus, ProgressError> {
        self.check_index(index)?;
        let status = if result.is_valid {
            StepStatus::Complete
        } else {
            StepStatus::HasErrors
        };
        self.set_status(index, status);
        Ok(status)
    }

    /// The data of `index` changed, so its last validation is outdated.
    ///
    /// `Complete` and `HasErrors` fall back to `Incomplete`; an unvisited
    /// step edited from elsewhere counts as visited.
    pub fn note_step_edited(&mut self, index: usize) -> Result<StepStatus, ProgressError> {
        self.check_index(index)?;
        let status = match self.step_status(index) {
            Some(StepStatus::Complete | StepStatus::HasErrors | StepStatus::NotVisited) | None => {
                StepStatus::Incomplete
            }
            Some(StepStatus::Incomplete) => StepStatus::Incomplete,
        };
        self.set_status(index, status);
        Ok(status)
    }

    /// Data another step's rule reads changed: a validated `index` falls back
    /// to `Incomplete`. Unvisited and incomplete steps are left alone.
    pub fn invalidate_step(&mut self, index: usize) -> Result<StepStatus, ProgressError> {
        self.check_index(index)?;
        let status = match self.step_status(index) {
            Some(StepStatus::Complete | StepStatus::HasErrors) => StepStatus::Incomplete,
            Some(other) => other,
            None => StepStatus::NotVisited,
        };
        self.set_status(index, status);
        Ok(status)
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.state.last_saved_at = Some(at);
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Completed steps as a whole percentage, rounded half up.
    pub fn progress_percentage(&self) -> u8 {
        let total = self.steps.len();
        let completed = self.state.completed_steps().min(total);
        let rounded = (completed * 200 + total) / (2 * total);
        u8::try_from(rounded).unwrap_or(100)
    }

    /// Steps that are not `Complete`, in step order.
    pub fn incomplete_steps(&self) -> Vec<&StepConfig> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(index, _)| self.step_status(*index) != Some(StepStatus::Complete))
            .map(|(_, step)| step)
            .collect()
    }

    /// Submission gate: every step must be `Complete`, wherever the pointer is.
    pub fn check_submission(&self) -> Result<(), ProgressError> {
        let blocked: Vec<String> = self
            .incomplete_steps()
            .into_iter()
            .map(|step| step.title.clone())
            .collect();
        if blocked.is_empty() {
            Ok(())
        } else {
            tracing::info!(incomplete = blocked.len(), "submission blocked");
            Err(ProgressError::SubmissionBlocked { steps: blocked })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(n: usize) -> Vec<StepConfig> {
        (0..n)
            .map(|i| StepConfig::new(format!("step_{i}"), format!("Step {i}")))
            .collect()
    }

    #[test]
    fn test_new_requires_steps() {
        assert_eq!(ProgressTracker::new(Vec::new()).unwrap_err(), ProgressError::NoSteps);
    }

    #[test]
    fn test_navigation_is_never_blocked() {
        let mut tracker = ProgressTracker::new(steps(5)).unwrap();
        tracker.update_step_status(0, StepStatus::HasErrors).unwrap();

        for target in [4, 2, 0, 3, 1] {
            tracker.set_current_step(target).unwrap();
            assert_eq!(tracker.current_step(), target);
        }
        assert_eq!(tracker.step_status(4), Some(StepStatus::Incomplete));
    }

    #[test]
    fn test_out_of_range_step_rejected_without_change() {
        let mut tracker = ProgressTracker::new(steps(3)).unwrap();
        tracker.set_current_step(1).unwrap();
        let err = tracker.set_current_step(3).unwrap_err();
        assert_eq!(err, ProgressError::StepOutOfRange { index: 3, total: 3 });
        assert_eq!(tracker.current_step(), 1);
        assert!(tracker.mark_step_complete(9).is_err());
    }

    #[test]
    fn test_can_proceed_follows_current_step_validation() {
        let mut tracker = ProgressTracker::new(steps(3)).unwrap();
        assert!(!tracker.can_proceed());

        tracker.record_validation(0, &ValidationResult::invalid("missing")).unwrap();
        assert_eq!(tracker.step_status(0), Some(StepStatus::HasErrors));
        assert!(!tracker.can_proceed());

        tracker.record_validation(0, &ValidationResult::valid()).unwrap();
        assert_eq!(tracker.step_status(0), Some(StepStatus::Complete));
        assert!(tracker.can_proceed());

        tracker.record_validation(2, &ValidationResult::invalid("x")).unwrap();
        assert!(tracker.can_proceed());

        tracker.set_current_step(2).unwrap();
        assert!(!tracker.can_proceed());
        tracker.set_current_step(0).unwrap();
        assert!(tracker.can_proceed());
    }

    #[test]
    fn test_editing_demotes_validated_step() {
        let mut tracker = ProgressTracker::new(steps(2)).unwrap();
        tracker.mark_step_complete(0).unwrap();
        assert_eq!(tracker.note_step_edited(0).unwrap(), StepStatus::Incomplete);
        assert!(!tracker.can_proceed());

        tracker.update_step_status(1, StepStatus::HasErrors).unwrap();
        assert_eq!(tracker.note_step_edited(1).unwrap(), StepStatus::Incomplete);
    }

    #[test]
    fn test_progress_percentage_rounds() {
        let mut tracker = ProgressTracker::new(steps(9)).unwrap();
        assert_eq!(tracker.progress_percentage(), 0);
        for i in 0..3 {
            tracker.mark_step_complete(i).unwrap();
        }
        assert_eq!(tracker.progress_percentage(), 33);
        for i in 3..6 {
            tracker.mark_step_complete(i).unwrap();
        }
        assert_eq!(tracker.progress_percentage(), 67);

        let mut halves = ProgressTracker::new(steps(8)).unwrap();
        halves.mark_step_complete(0).unwrap();
        // 12.5 rounds up
        assert_eq!(halves.progress_percentage(), 13);
    }

    #[test]
    fn test_submission_names_every_incomplete_step() {
        let mut tracker = ProgressTracker::new(steps(4)).unwrap();
        tracker.mark_step_complete(0).unwrap();
        tracker.update_step_status(2, StepStatus::HasErrors).unwrap();
        tracker.mark_step_complete(3).unwrap();
        tracker.set_current_step(3).unwrap();

        let err = tracker.check_submission().unwrap_err();
        assert_eq!(
            err,
            ProgressError::SubmissionBlocked {
                steps: vec!["Step 1".to_string(), "Step 2".to_string()]
            }
        );

        tracker.mark_step_complete(1).unwrap();
        tracker.mark_step_complete(2).unwrap();
        assert!(tracker.check_submission().is_ok());
        assert_eq!(tracker.progress_percentage(), 100);
    }

    #[test]
    fn test_from_state_rederives_can_proceed() {
        let mut tracker = ProgressTracker::new(steps(3)).unwrap();
        tracker.mark_step_complete(0).unwrap();
        tracker.set_current_step(1).unwrap();

        let mut saved = tracker.state().clone();
        saved.can_proceed = true;
        let restored = ProgressTracker::from_state(steps(3), saved).unwrap();
        assert_eq!(restored.current_step(), 1);
        assert!(!restored.can_proceed());
        assert_eq!(restored.step_status(0), Some(StepStatus::Complete));
    }

    #[test]
    fn test_from_state_rejects_mismatched_steps() {
        let state = ProgressState::new(3);
        assert_eq!(
            ProgressTracker::from_state(steps(4), state.clone()).unwrap_err(),
            ProgressError::StateMismatch { expected: 4 }
        );

        let mut bad_pointer = state;
        bad_pointer.current_step = 5;
        assert!(ProgressTracker::from_state(steps(3), bad_pointer).is_err());
    }

    #[test]
    fn test_mark_saved_records_timestamp() {
        let mut tracker = ProgressTracker::new(steps(1)).unwrap();
        let now = Utc::now();
        tracker.mark_saved(now);
        assert_eq!(tracker.last_saved_at(), Some(now));
    }

    #[test]
    fn test_invalidate_only_demotes_validated_steps() {
        let mut tracker = ProgressTracker::new(steps(4)).unwrap();
        tracker.mark_step_complete(1).unwrap();
        tracker.update_step_status(2, StepStatus::HasErrors).unwrap();

        assert_eq!(tracker.invalidate_step(1).unwrap(), StepStatus::Incomplete);
        assert_eq!(tracker.invalidate_step(2).unwrap(), StepStatus::Incomplete);
        assert_eq!(tracker.invalidate_step(3).unwrap(), StepStatus::NotVisited);
        assert_eq!(tracker.step_status(3), Some(StepStatus::NotVisited));
        assert!(tracker.invalidate_step(4).is_err());
    }
}
