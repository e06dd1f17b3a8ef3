use thiserror::Error;

/// Errors from repository operations (used by trait definitions in fleetdesk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors encoding or decoding a draft snapshot.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft serialization error: {0}")]
    Serialization(String),

    #[error("draft '{key}' has schema version {found}, newer than supported {supported}")]
    UnsupportedSchema {
        key: String,
        found: u32,
        supported: u32,
    },

    #[error("draft '{key}' belongs to the {found} builder, expected {expected}")]
    KindMismatch {
        key: String,
        found: String,
        expected: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
