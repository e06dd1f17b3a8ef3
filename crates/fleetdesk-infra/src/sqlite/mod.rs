//! SQLite storage layer with WAL mode and split read/write pools.

pub mod pool;
