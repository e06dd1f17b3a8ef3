//! Builder draft persistence adapters.

pub mod sqlite_draft_store;
