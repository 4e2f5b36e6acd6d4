// SPDX-License-Identifier: GPL-3.0-or-later
pub mod albums;
pub mod artists;
pub mod artwork;
pub mod jobs;
pub mod radio;
pub mod tracks;

mod schema;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calliope_domain::CacheStats;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{debug, info};

pub const SCHEMA_VERSION: &str = "1";

const META_SCHEMA_VERSION: &str = "schema_version";
const META_LAST_FULL_BUILD: &str = "last_full_build";
const META_LAST_UPDATED: &str = "last_updated";

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// The library cache: a single SQLite file owning the catalog tables, the
/// artwork index, and the durable enrichment-job queue.
///
/// The pool is capped at one connection, so the store is the sole writer;
/// WAL journaling plus the busy timeout keep concurrent readers unblocked at
/// the statement level.
#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: SqlitePool,
    build_state: Arc<BuildState>,
}

#[derive(Debug, Default)]
struct BuildState {
    building: AtomicBool,
    progress: AtomicU8,
}

impl CacheStore {
    /// Open (creating if missing) `<data_dir>/library.db`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let db_path = data_dir.as_ref().join("library.db");
        Self::open_file(&db_path).await
    }

    /// Open a store at an explicit database file path.
    pub async fn open_file(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(target: "store", path = %db_path.display(), "opening library database");

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            build_state: Arc::new(BuildState::default()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_SQL).execute(&self.pool).await?;

        match self.get_meta(META_SCHEMA_VERSION).await? {
            None => {
                self.set_meta(META_SCHEMA_VERSION, SCHEMA_VERSION).await?;
                info!(target: "store", version = SCHEMA_VERSION, "initialized fresh schema");
            }
            Some(version) if version == SCHEMA_VERSION => {
                debug!(target: "store", %version, "schema version verified");
            }
            // Migration slot: when a version 2 exists its upgrade runs here.
            Some(version) => return Err(StoreError::UnsupportedSchema(version)),
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // ------------------------------------------------------------------
    // Metadata key/value
    // ------------------------------------------------------------------

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM cache_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache_meta (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Build state
    // ------------------------------------------------------------------

    /// Advisory flag; readers never block on it.
    pub fn set_building(&self, building: bool) {
        self.build_state.building.store(building, Ordering::Relaxed);
    }

    pub fn is_building(&self) -> bool {
        self.build_state.building.load(Ordering::Relaxed)
    }

    pub fn set_build_progress(&self, percent: u8) {
        self.build_state
            .progress
            .store(percent.min(100), Ordering::Relaxed);
    }

    pub fn build_progress(&self) -> u8 {
        self.build_state.progress.load(Ordering::Relaxed)
    }

    /// Record the completion timestamps of a full build.
    pub async fn mark_build_complete(&self) -> Result<()> {
        let now = fmt_dt(Utc::now());
        self.set_meta(META_LAST_FULL_BUILD, &now).await?;
        self.set_meta(META_LAST_UPDATED, &now).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Catalog-wide operations
    // ------------------------------------------------------------------

    /// Truncate the catalog tables ahead of a rebuild. Artwork and
    /// cache_meta survive; enrichment jobs are reaped separately.
    pub async fn clear_catalog(&self) -> Result<()> {
        debug!(target: "store", "clearing catalog tables");
        let mut tx = self.begin().await?;
        for table in ["tracks", "albums", "artists", "radio_stations"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats {
            albums: self.count_table("albums").await?,
            artists: self.count_table("artists").await?,
            tracks: self.count_table("tracks").await?,
            stations: self.count_table("radio_stations").await?,
            artwork: self.count_table("artwork").await?,
            ..CacheStats::default()
        };
        stats.last_full_build = self
            .get_meta(META_LAST_FULL_BUILD)
            .await?
            .and_then(|s| parse_dt(&s).ok());
        stats.last_updated = self
            .get_meta(META_LAST_UPDATED)
            .await?
            .and_then(|s| parse_dt(&s).ok());
        stats.is_building = self.is_building();
        stats.build_progress = self.build_progress();
        Ok(stats)
    }

    async fn count_table(&self, table: &str) -> Result<u64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") as u64)
    }
}

// ----------------------------------------------------------------------------
// Timestamp helpers
// ----------------------------------------------------------------------------

/// Fixed-width UTC timestamp; lexicographic order equals chronological order,
/// which the job queue's `next_retry_at <= now` comparison relies on.
pub(crate) fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_dt(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
    let ndt = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", s, e)))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

pub(crate) fn opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_dt(&s)).transpose()
}

/// Empty strings in the schema stand in for "not set".
pub(crate) fn opt_str(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
