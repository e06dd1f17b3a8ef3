//! Builder sessions and draft persistence.
//!
//! - `session`: generic session over data, progress and a rule registry
//! - `agreement` / `reservation`: typed update commands for each builder
//! - `draft_store`: the persistence port
//! - `autosave`: debounced writes through that port

pub mod agreement;
pub mod autosave;
pub mod draft_store;
pub mod reservation;
pub mod session;

pub use session::{Advance, BuilderSession};
