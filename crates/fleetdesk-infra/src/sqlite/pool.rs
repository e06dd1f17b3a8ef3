//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows a single writer. Draft saves go through a one-connection
//! writer pool so concurrent autosaves are serialized; listing and loading
//! use a small read-only pool.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const READER_CONNECTIONS: u32 = 4;

#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the database at `database_url` and run
    /// migrations on the writer before the reader pool opens.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts.clone())
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(base_opts.read_only(true))
            .await?;

        tracing::debug!(url = database_url, "draft database opened");
        Ok(Self { reader, writer })
    }
}

/// `sqlite://{data_dir}/fleetdesk.db`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}", data_dir.join("fleetdesk.db").display())
}
