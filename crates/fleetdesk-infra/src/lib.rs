//! Infrastructure layer for Fleetdesk.
//!
//! Implementations of the ports defined in `fleetdesk-core`: SQLite draft
//! storage, SHA-256 content hashing, plus the `config.toml` loader and
//! data directory resolution.

pub mod builder;
pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod sqlite;
