//! Builder core for Fleetdesk.
//!
//! Three leaf components shared by the Agreement Wizard and the Reservation
//! Builder:
//!
//! - `validation` -- pure per-step rule sets behind a fault-tolerant registry
//! - `pricing` -- tiered line pricing, repricing and staleness detection
//! - `progress` -- the step status state machine and submission gate
//!
//! `builder` composes them into sessions and defines the draft persistence
//! port. This crate depends only on `fleetdesk-types` -- never on
//! `fleetdesk-infra` or any database/IO crate.

pub mod builder;
pub mod hash;
pub mod pricing;
pub mod progress;
pub mod validation;
