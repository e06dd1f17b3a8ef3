//! Line pricing, agreement breakdowns and staleness detection.

pub mod breakdown;
pub mod engine;
pub mod staleness;

pub use breakdown::PricingBreakdown;
pub use engine::{LineExtras, PricingEngine, PricingError, RateSelection, TAX_RATE};
pub use staleness::{stale_line_ids, StalePricing, StalenessTracker};
