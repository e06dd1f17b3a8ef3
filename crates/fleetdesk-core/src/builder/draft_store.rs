//! Builder draft persistence port.
//!
//! Defines `DraftStore` for saving and restoring builder sessions so an
//! operator can leave a half-finished agreement or reservation and resume it
//! later. Drafts are keyed by a caller-chosen storage key (for example
//! `agreement-<uuid>`) and hold the serialized `{ wizardData, progress }`
//! snapshot.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use fleetdesk_types::draft::{BuilderKind, DRAFT_SCHEMA_VERSION, DraftSnapshot};
use fleetdesk_types::error::{DraftError, RepositoryError};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A saved draft containing the full serialized snapshot.
///
/// `schema_version` lets a later release recognize snapshots written by an
/// older one before deserializing `state_json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub key: String,
    pub kind: BuilderKind,
    /// Serialized `DraftSnapshot` as JSON.
    pub state_json: String,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight summary of a draft for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSummary {
    pub key: String,
    pub kind: BuilderKind,
    pub current_step: usize,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence interface for builder drafts.
///
/// Failures propagate as errors; callers must not let them touch in-memory
/// progress.
pub trait DraftStore: Send + Sync {
    /// Save or replace the draft stored under `draft.key`.
    fn save_draft(&self, draft: Draft) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Load a draft by key. Returns `None` when no draft exists.
    fn load_draft(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Draft>, RepositoryError>> + Send;

    /// All drafts, most recently updated first.
    fn list_drafts(&self) -> impl Future<Output = Result<Vec<DraftSummary>, RepositoryError>> + Send;

    /// Delete a draft. No-op if it does not exist.
    fn delete_draft(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A shared store, so an autosaver and direct readers can use one pool.
impl<T: DraftStore> DraftStore for Arc<T> {
    fn save_draft(&self, draft: Draft) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        T::save_draft(self, draft)
    }

    fn load_draft(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Draft>, RepositoryError>> + Send {
        T::load_draft(self, key)
    }

    fn list_drafts(&self) -> impl Future<Output = Result<Vec<DraftSummary>, RepositoryError>> + Send {
        T::list_drafts(self)
    }

    fn delete_draft(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        T::delete_draft(self, key)
    }
}

// ---------------------------------------------------------------------------
// Snapshot encoding
// ---------------------------------------------------------------------------

/// Serialize a snapshot into a storable draft.
pub fn encode_draft<D: Serialize>(
    key: &str,
    kind: BuilderKind,
    snapshot: &DraftSnapshot<D>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<Draft, DraftError> {
    let state_json =
        serde_json::to_string(snapshot).map_err(|e| DraftError::Serialization(e.to_string()))?;
    Ok(Draft {
        key: key.to_string(),
        kind,
        state_json,
        schema_version: DRAFT_SCHEMA_VERSION,
        created_at,
        updated_at,
    })
}

/// Deserialize a stored draft written by the `expected` builder.
pub fn decode_draft<D: DeserializeOwned>(
    draft: &Draft,
    expected: BuilderKind,
) -> Result<DraftSnapshot<D>, DraftError> {
    if draft.schema_version > DRAFT_SCHEMA_VERSION {
        return Err(DraftError::UnsupportedSchema {
            key: draft.key.clone(),
            found: draft.schema_version,
            supported: DRAFT_SCHEMA_VERSION,
        });
    }
    if draft.kind != expected {
        return Err(DraftError::KindMismatch {
            key: draft.key.clone(),
            found: draft.kind.to_string(),
            expected: expected.to_string(),
        });
    }
    serde_json::from_str(&draft.state_json).map_err(|e| DraftError::Serialization(e.to_string()))
}
