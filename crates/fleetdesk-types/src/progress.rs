//! Step progress types shared by both builders.
//!
//! A builder is an ordered list of steps (agreement wizard pages or
//! reservation accordion sections). Each step carries exactly one
//! [`StepStatus`]; [`ProgressState`] records those statuses together with
//! the current step pointer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single builder step.
///
/// - NotVisited: the operator has never opened the step
/// - Incomplete: opened, but not validated since the last edit
/// - HasErrors: validation ran against current data and failed
/// - Complete: validation ran against current data and passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotVisited,
    Incomplete,
    HasErrors,
    Complete,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::NotVisited => write!(f, "not_visited"),
            StepStatus::Incomplete => write!(f, "incomplete"),
            StepStatus::HasErrors => write!(f, "has_errors"),
            StepStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Orchestrator-supplied step descriptor.
///
/// The core only uses the position of a step and its title (for naming
/// offending steps at submission time); it has no knowledge of step semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Stable step key (e.g. "rental_period").
    pub id: String,
    /// Human-readable title shown to the operator.
    pub title: String,
}

impl StepConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Serializable progress of one builder session.
///
/// `statuses` holds one entry per step index in `0..total_steps`.
/// `can_proceed` is derived by the state machine from the last validation of
/// `current_step`; consumers must never set it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub current_step: usize,
    pub statuses: BTreeMap<usize, StepStatus>,
    pub can_proceed: bool,
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// Fresh progress for `total_steps` steps, positioned on step 0.
    ///
    /// The first step is considered visited as soon as the session opens.
    pub fn new(total_steps: usize) -> Self {
        let mut statuses: BTreeMap<usize, StepStatus> = (0..total_steps)
            .map(|index| (index, StepStatus::NotVisited))
            .collect();
        if let Some(first) = statuses.get_mut(&0) {
            *first = StepStatus::Incomplete;
        }

        Self {
            current_step: 0,
            statuses,
            can_proceed: false,
            last_saved_at: None,
        }
    }

    /// Number of steps whose status is `Complete`.
    pub fn completed_steps(&self) -> usize {
        self.statuses
            .values()
            .filter(|status| **status == StepStatus::Complete)
            .count()
    }
}
