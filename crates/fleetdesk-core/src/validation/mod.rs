//! Step validation registry and the builders' rule sets.
//!
//! A [`ValidationRegistry`] maps a step index to a pure rule. Rules receive a
//! read-only snapshot of the builder data and return a [`ValidationResult`].
//! The registry is the fault boundary: unknown steps, rules that report a
//! [`ValidatorFault`], and rules that panic all come back as an ordinary
//! failing result, so callers never see an error path.

pub mod agreement;
pub mod reservation;

use std::panic::{self, AssertUnwindSafe};

use fleetdesk_types::validation::ValidationResult;

/// Message returned when a rule implementation fails unexpectedly.
pub const INTERNAL_VALIDATION_ERROR: &str = "Internal validation error";

/// Message returned for a step index with no registered rule.
pub const UNKNOWN_STEP_ERROR: &str = "Unknown step";

/// A rule implementation failure (not a user-facing validation error).
#[derive(Debug, thiserror::Error)]
#[error("validator fault: {0}")]
pub struct ValidatorFault(pub String);

type StepRule<D> = Box<dyn Fn(&D) -> Result<ValidationResult, ValidatorFault> + Send + Sync>;

/// Ordered rule set, one rule per step index.
pub struct ValidationRegistry<D> {
    rules: Vec<StepRule<D>>,
    /// `(step, source)`: the rule of `step` also reads the data of `source`.
    dependencies: Vec<(usize, usize)>,
}

impl<D> Default for ValidationRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> ValidationRegistry<D> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Append an infallible rule for the next step index.
    pub fn with_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&D) -> ValidationResult + Send + Sync + 'static,
    {
        self.rules.push(Box::new(move |data| Ok(rule(data))));
        self
    }

    /// Append a rule that may report an implementation fault.
    pub fn with_fallible_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&D) -> Result<ValidationResult, ValidatorFault> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Declare that the rule of `step` also reads the data of `source`, so
    /// an edit of `source` outdates the last validation of `step`.
    pub fn with_dependency(mut self, step: usize, source: usize) -> Self {
        if step != source && !self.dependencies.contains(&(step, source)) {
            self.dependencies.push((step, source));
        }
        self
    }

    /// Steps whose rules read the data of `source`.
    pub fn dependents_of(&self, source: usize) -> impl Iterator<Item = usize> + '_ {
        self.dependencies
            .iter()
            .filter(move |(_, from)| *from == source)
            .map(|(step, _)| *step)
    }

    /// Number of steps with a registered rule.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate `step` against `data`. Never panics and never errors.
    pub fn validate(&self, step: usize, data: &D) -> ValidationResult {
        let Some(rule) = self.rules.get(step) else {
            tracing::warn!(step, "validation requested for unknown step");
            return ValidationResult::invalid(UNKNOWN_STEP_ERROR);
        };

        match panic::catch_unwind(AssertUnwindSafe(|| rule(data))) {
            Ok(Ok(result)) => normalize(result),
            Ok(Err(fault)) => {
                tracing::error!(step, error = %fault, "step validator reported a fault");
                ValidationResult::invalid(INTERNAL_VALIDATION_ERROR)
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(step, panic = %message, "step validator panicked");
                ValidationResult::invalid(INTERNAL_VALIDATION_ERROR)
            }
        }
    }
}

/// `is_valid` always mirrors the error list, whatever the rule returned.
fn normalize(result: ValidationResult) -> ValidationResult {
    ValidationResult::from_messages(result.errors, result.warnings)
}

/// Accumulates messages while a rule inspects a step.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Checks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record `message` as an error when `value` is absent or blank.
    pub(crate) fn require_text(&mut self, value: Option<&str>, message: &str) {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.error(message);
        }
    }

    pub(crate) fn finish(self) -> ValidationResult {
        ValidationResult::from_messages(self.errors, self.warnings)
    }
}
