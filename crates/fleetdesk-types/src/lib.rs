//! Shared domain types for Fleetdesk.
//!
//! This crate contains the types exchanged between the builder core and its
//! consumers: step progress, validation outcomes, rate contexts and priced
//! lines, the typed data of the Agreement Wizard and Reservation Builder,
//! draft snapshots, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror
//! and rust_decimal.

pub mod agreement;
pub mod config;
pub mod draft;
pub mod error;
pub mod pricing;
pub mod progress;
pub mod reservation;
pub mod validation;
