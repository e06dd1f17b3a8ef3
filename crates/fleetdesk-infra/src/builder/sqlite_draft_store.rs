//! SQLite implementation of `DraftStore`.
//!
//! Drafts live in the `builder_drafts` table and are upserted on their key.
//! Listing reads the step pointer and statuses straight out of `state_json`
//! so summaries never deserialize the builder data.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use fleetdesk_core::builder::draft_store::{Draft, DraftStore, DraftSummary};
use fleetdesk_types::draft::BuilderKind;
use fleetdesk_types::error::RepositoryError;

use crate::sqlite::pool::DatabasePool;

pub struct SqliteDraftStore {
    pool: DatabasePool,
}

impl SqliteDraftStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn parse_kind(s: &str) -> Result<BuilderKind, RepositoryError> {
    s.parse::<BuilderKind>().map_err(RepositoryError::Query)
}

/// Current step, completed steps and total steps from a snapshot's progress.
fn progress_counts(state_json: &str) -> (usize, usize, usize) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(state_json) else {
        return (0, 0, 0);
    };
    let progress = &value["progress"];
    let current = progress["currentStep"].as_u64().unwrap_or(0) as usize;
    let (completed, total) = progress["statuses"]
        .as_object()
        .map(|statuses| {
            let completed = statuses
                .values()
                .filter(|status| status.as_str() == Some("complete"))
                .count();
            (completed, statuses.len())
        })
        .unwrap_or((0, 0));
    (current, completed, total)
}

fn row_to_draft(row: &SqliteRow) -> Result<Draft, RepositoryError> {
    let key: String = row.try_get("draft_key").map_err(query_err)?;
    let kind: String = row.try_get("kind").map_err(query_err)?;
    let state_json: String = row.try_get("state_json").map_err(query_err)?;
    let schema_version: i64 = row.try_get("schema_version").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(Draft {
        key,
        kind: parse_kind(&kind)?,
        state_json,
        schema_version: u32::try_from(schema_version)
            .map_err(|_| RepositoryError::Query(format!("invalid schema_version: {schema_version}")))?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

// ---------------------------------------------------------------------------
// DraftStore implementation
// ---------------------------------------------------------------------------

impl DraftStore for SqliteDraftStore {
    async fn save_draft(&self, draft: Draft) -> Result<(), RepositoryError> {
        // created_at of an existing row is kept on update.
        sqlx::query(
            r#"INSERT INTO builder_drafts (draft_key, kind, state_json, schema_version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(draft_key) DO UPDATE SET
                   kind = excluded.kind,
                   state_json = excluded.state_json,
                   schema_version = excluded.schema_version,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&draft.key)
        .bind(draft.kind.to_string())
        .bind(&draft.state_json)
        .bind(i64::from(draft.schema_version))
        .bind(draft.created_at.to_rfc3339())
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        tracing::debug!(key = %draft.key, kind = %draft.kind, "draft written");
        Ok(())
    }

    async fn load_draft(&self, key: &str) -> Result<Option<Draft>, RepositoryError> {
        let row = sqlx::query(
            "SELECT draft_key, kind, state_json, schema_version, created_at, updated_at FROM builder_drafts WHERE draft_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        row.as_ref().map(row_to_draft).transpose()
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT draft_key, kind, state_json, updated_at FROM builder_drafts ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let key: String = row.try_get("draft_key").map_err(query_err)?;
            let kind: String = row.try_get("kind").map_err(query_err)?;
            let state_json: String = row.try_get("state_json").map_err(query_err)?;
            let updated_at: String = row.try_get("updated_at").map_err(query_err)?;
            let (current_step, completed_steps, total_steps) = progress_counts(&state_json);

            summaries.push(DraftSummary {
                key,
                kind: parse_kind(&kind)?,
                current_step,
                completed_steps,
                total_steps,
                updated_at: parse_datetime(&updated_at)?,
            });
        }
        Ok(summaries)
    }

    async fn delete_draft(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM builder_drafts WHERE draft_key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fleetdesk_core::builder::draft_store::{decode_draft, encode_draft};
    use fleetdesk_types::agreement::{AgreementData, AgreementSource};
    use fleetdesk_types::draft::DraftSnapshot;
    use fleetdesk_types::progress::{ProgressState, StepStatus};

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("drafts.db").display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn agreement_draft(key: &str, updated_at: DateTime<Utc>) -> Draft {
        let mut data = AgreementData::default();
        data.source.source = Some(AgreementSource::Direct);
        let mut progress = ProgressState::new(9);
        progress.statuses.insert(0, StepStatus::Complete);
        progress.current_step = 1;
        let snapshot = DraftSnapshot {
            wizard_data: data,
            progress,
        };
        encode_draft(key, BuilderKind::Agreement, &snapshot, updated_at, updated_at).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = SqliteDraftStore::new(test_pool().await);
        assert!(store.load_draft("agreement-none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_draft_decodes() {
        let store = SqliteDraftStore::new(test_pool().await);
        let draft = agreement_draft("agreement-1", Utc::now());
        store.save_draft(draft.clone()).await.unwrap();

        let loaded = store.load_draft("agreement-1").await.unwrap().unwrap();
        assert_eq!(loaded.kind, BuilderKind::Agreement);
        assert_eq!(loaded.state_json, draft.state_json);

        let snapshot: DraftSnapshot<AgreementData> = decode_draft(&loaded, BuilderKind::Agreement).unwrap();
        assert_eq!(snapshot.progress.current_step, 1);
        assert_eq!(snapshot.wizard_data.source.source, Some(AgreementSource::Direct));
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let store = SqliteDraftStore::new(test_pool().await);
        let first = Utc::now() - Duration::hours(2);
        store.save_draft(agreement_draft("agreement-1", first)).await.unwrap();

        let mut newer = agreement_draft("agreement-1", Utc::now());
        newer.state_json = newer.state_json.replace("\"currentStep\":1", "\"currentStep\":2");
        store.save_draft(newer).await.unwrap();

        let loaded = store.load_draft("agreement-1").await.unwrap().unwrap();
        assert_eq!(loaded.created_at.timestamp(), first.timestamp());
        assert!(loaded.state_json.contains("\"currentStep\":2"));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_progress() {
        let store = SqliteDraftStore::new(test_pool().await);
        let now = Utc::now();
        store
            .save_draft(agreement_draft("agreement-old", now - Duration::days(1)))
            .await
            .unwrap();
        store.save_draft(agreement_draft("agreement-new", now)).await.unwrap();

        let summaries = store.list_drafts().await.unwrap();
        let keys: Vec<&str> = summaries.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["agreement-new", "agreement-old"]);
        assert_eq!(summaries[0].current_step, 1);
        assert_eq!(summaries[0].completed_steps, 1);
        assert_eq!(summaries[0].total_steps, 9);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = SqliteDraftStore::new(test_pool().await);
        store.save_draft(agreement_draft("agreement-1", Utc::now())).await.unwrap();
        store.delete_draft("agreement-1").await.unwrap();
        store.delete_draft("agreement-1").await.unwrap();
        assert!(store.load_draft("agreement-1").await.unwrap().is_none());
    }

    #[test]
    fn test_progress_counts_tolerates_garbage() {
        assert_eq!(progress_counts("not json"), (0, 0, 0));
    }
}
