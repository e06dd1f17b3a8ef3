//! Application state wiring the draft store and pricing engine together.
//!
//! The core is generic over the hasher and draft store; AppState pins them
//! to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use fleetdesk_core::builder::autosave::DraftAutosaver;
use fleetdesk_core::pricing::PricingEngine;
use fleetdesk_infra::builder::sqlite_draft_store::SqliteDraftStore;
use fleetdesk_infra::config::autosave_debounce;
use fleetdesk_infra::crypto::hash::Sha256ContentHasher;
use fleetdesk_infra::sqlite::pool::{database_url, DatabasePool};
use fleetdesk_types::config::GlobalConfig;

pub type ConcretePricingEngine = PricingEngine<Sha256ContentHasher>;

/// Shared state of the draft commands.
#[derive(Clone)]
pub struct AppState {
    pub config: GlobalConfig,
    pub drafts: Arc<SqliteDraftStore>,
}

impl AppState {
    /// Open the draft database inside `data_dir`, creating it if needed.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        Ok(Self {
            config,
            drafts: Arc::new(SqliteDraftStore::new(db_pool)),
        })
    }

    pub fn pricing_engine(&self) -> ConcretePricingEngine {
        PricingEngine::new(self.config.pricing.clone(), Sha256ContentHasher)
    }

    /// Autosaver writing through the shared draft store.
    pub fn autosaver(&self) -> DraftAutosaver<Arc<SqliteDraftStore>> {
        DraftAutosaver::new(Arc::clone(&self.drafts), autosave_debounce(&self.config))
    }
}
