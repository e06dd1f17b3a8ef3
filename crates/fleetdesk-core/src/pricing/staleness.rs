//! Detection of lines priced against an outdated rate context.

use uuid::Uuid;

use fleetdesk_types::pricing::PricedLine;

/// Signal raised when the rate context changes while priced lines exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalePricing {
    pub previous_hash: String,
    pub current_hash: String,
    /// Number of lines in the builder when the change was observed.
    pub line_count: usize,
}

/// Tracks the last observed rate context hash of one builder session.
///
/// [`StalenessTracker::observe`] returns a signal exactly once per change,
/// and only while at least one line exists. A change observed with no lines
/// still moves the baseline, so adding lines later does not raise a signal
/// for it.
#[derive(Debug, Clone)]
pub struct StalenessTracker {
    last_seen_hash: String,
    pending: Option<StalePricing>,
}

impl StalenessTracker {
    pub fn new(initial_hash: impl Into<String>) -> Self {
        Self {
            last_seen_hash: initial_hash.into(),
            pending: None,
        }
    }

    pub fn last_seen_hash(&self) -> &str {
        &self.last_seen_hash
    }

    /// Record the current context hash.
    pub fn observe(&mut self, current_hash: &str, line_count: usize) -> Option<StalePricing> {
        if self.last_seen_hash == current_hash {
            return None;
        }
        let previous_hash = std::mem::replace(&mut self.last_seen_hash, current_hash.to_string());

        if line_count == 0 {
            self.pending = None;
            return None;
        }

        let signal = StalePricing {
            previous_hash,
            current_hash: current_hash.to_string(),
            line_count,
        };
        tracing::debug!(
            previous = %signal.previous_hash,
            current = %signal.current_hash,
            lines = line_count,
            "rate context changed with priced lines"
        );
        self.pending = Some(signal.clone());
        Some(signal)
    }

    /// The unresolved signal, if any.
    pub fn pending(&self) -> Option<&StalePricing> {
        self.pending.as_ref()
    }

    /// Operator chose to keep the existing prices.
    pub fn dismiss(&mut self) -> Option<StalePricing> {
        self.pending.take()
    }

    /// Lines were repriced against `hash`.
    pub fn acknowledge_reprice(&mut self, hash: &str) {
        self.last_seen_hash = hash.to_string();
        self.pending = None;
    }
}

/// Ids of the lines priced against a context other than `current_hash`.
pub fn stale_line_ids(lines: &[PricedLine], current_hash: &str) -> Vec<Uuid> {
    lines
        .iter()
        .filter(|line| line.is_stale(current_hash))
        .map(|line| line.id)
        .collect()
}
