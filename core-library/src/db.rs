//! # Font Store Connection Pool
//!
//! Opens the SQLite database holding categories, fonts and preview images,
//! applies the embedded migrations and hands back a ready [`SqlitePool`].
//!
//! File-backed stores run in WAL mode. Foreign keys are always on because
//! deleting a font must cascade to its `font_images` rows.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("fonts.db")).await?;
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the font store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    File(PathBuf),
    /// Private to one connection; gone when the pool closes
    Memory,
}

/// Pool settings for the font store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub target: StorageTarget,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on SQLite's lock before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            target: StorageTarget::File(database_path.into()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Every connection to `:memory:` opens a separate database, so the pool
    /// is pinned to one connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            target: StorageTarget::Memory,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.target == StorageTarget::Memory
    }

    /// Ignored for in-memory stores
    pub fn max_connections(mut self, max: u32) -> Self {
        if !self.is_in_memory() {
            self.max_connections = max.max(1);
        }
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = match &self.target {
            StorageTarget::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            StorageTarget::Memory => SqliteConnectOptions::from_str("sqlite::memory:")?,
        };

        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }

    fn describe(&self) -> String {
        match &self.target {
            StorageTarget::File(path) => path.display().to_string(),
            StorageTarget::Memory => ":memory:".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the pool, migrate the schema and verify a connection works
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    info!(
        database = %config.describe(),
        max_connections = config.max_connections,
        "Opening font store"
    );

    let mut pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);

    if config.is_in_memory() {
        pool_options = pool_options
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = pool_options
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to open font store");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    debug!(connections = pool.size(), "Font store ready");
    Ok(pool)
}

/// In-memory store with the schema applied
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}
