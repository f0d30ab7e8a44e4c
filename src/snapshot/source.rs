//! Lock snapshot sources
//!
//! A source produces the complete list of lock rows for one analysis run. It is
//! read exactly once and fully before any graph work starts.

use crate::config::{Flavor, SourceConfig};
use crate::error::{Error, Result};
use crate::lock::{LockRow, LockableObject};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::Row;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Reads the whole lock snapshot.
    async fn fetch(&self) -> Result<Vec<LockRow>>;

    /// Human readable origin of the snapshot, for logs.
    fn describe(&self) -> String;
}

/// Builds the source selected by `config`: a snapshot file when one is set,
/// otherwise the live database.
pub fn source_from_config(config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
    match &config.snapshot_file {
        Some(path) => Ok(Box::new(FileLockSource::new(path.clone()))),
        None => Ok(Box::new(PgLockSource::new(config)?)),
    }
}

/// Reads `pg_locks` from a live PostgreSQL or Greenplum server.
pub struct PgLockSource {
    options: PgConnectOptions,
    flavor: Flavor,
    connect_timeout: Duration,
}

impl PgLockSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        // Without a URL, sqlx falls back to the PG* environment variables.
        let options = match &config.database_url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| Error::ConfigError(format!("Invalid database url: {}", e)))?,
            None => PgConnectOptions::new(),
        };

        Ok(Self {
            options,
            flavor: config.flavor,
            connect_timeout: Duration::from_secs(config.connect_timeout),
        })
    }

    /// Snapshot query. Numeric columns are cast to int8 so every row decodes
    /// the same way on both flavors.
    pub fn query(flavor: Flavor) -> &'static str {
        match flavor {
            Flavor::Greenplum => {
                "SELECT gp_segment_id::int8 AS gp_segment_id, locktype, \
                 database::int8 AS database, relation::int8 AS relation, \
                 page::int8 AS page, tuple::int8 AS tuple, virtualxid, \
                 transactionid::text::int8 AS transactionid, classid::int8 AS classid, \
                 objid::int8 AS objid, objsubid::int8 AS objsubid, \
                 mode, granted, mppsessionid::int8 AS session \
                 FROM pg_locks"
            }
            Flavor::Postgres => {
                "SELECT NULL::int8 AS gp_segment_id, locktype, \
                 database::int8 AS database, relation::int8 AS relation, \
                 page::int8 AS page, tuple::int8 AS tuple, virtualxid, \
                 transactionid::text::int8 AS transactionid, classid::int8 AS classid, \
                 objid::int8 AS objid, objsubid::int8 AS objsubid, \
                 mode, granted, pid::int8 AS session \
                 FROM pg_locks"
            }
        }
    }

    fn decode_row(row: &PgRow) -> Result<LockRow> {
        Ok(LockRow {
            object: LockableObject {
                gp_segment_id: row.try_get("gp_segment_id")?,
                locktype: row.try_get("locktype")?,
                database: row.try_get("database")?,
                relation: row.try_get("relation")?,
                page: row.try_get("page")?,
                tuple: row.try_get("tuple")?,
                virtualxid: row.try_get("virtualxid")?,
                transactionid: row.try_get("transactionid")?,
                classid: row.try_get("classid")?,
                objid: row.try_get("objid")?,
                objsubid: row.try_get("objsubid")?,
            },
            mode: row.try_get("mode")?,
            granted: row.try_get("granted")?,
            session: row.try_get("session")?,
        })
    }
}

#[async_trait]
impl SnapshotSource for PgLockSource {
    async fn fetch(&self) -> Result<Vec<LockRow>> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.options.clone())
            .await
            .map_err(|e| Error::SourceUnavailable(format!("Failed to connect to database: {}", e)))?;

        let result = sqlx::query(Self::query(self.flavor)).fetch_all(&pool).await;
        pool.close().await;

        let rows = result
            .map_err(|e| Error::SourceUnavailable(format!("Failed to query pg_locks: {}", e)))?;
        info!(rows = rows.len(), source = %self.describe(), "Fetched lock snapshot");

        rows.iter().map(Self::decode_row).collect()
    }

    fn describe(&self) -> String {
        format!(
            "{} pg_locks at {}:{}/{}",
            self.flavor,
            self.options.get_host(),
            self.options.get_port(),
            self.options.get_database().unwrap_or("")
        )
    }
}

/// Reads a snapshot saved as a JSON array of lock rows.
pub struct FileLockSource {
    path: PathBuf,
}

impl FileLockSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileLockSource {
    async fn fetch(&self) -> Result<Vec<LockRow>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::SourceUnavailable(format!("Cannot read {}: {}", self.path.display(), e))
        })?;
        let rows: Vec<LockRow> = serde_json::from_slice(&bytes)?;
        debug!(rows = rows.len(), path = %self.path.display(), "Loaded lock snapshot file");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }
}

/// Snapshot already held in memory.
pub struct StaticLockSource {
    rows: Vec<LockRow>,
}

impl StaticLockSource {
    pub fn new(rows: Vec<LockRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl SnapshotSource for StaticLockSource {
    async fn fetch(&self) -> Result<Vec<LockRow>> {
        Ok(self.rows.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory snapshot ({} rows)", self.rows.len())
    }
}
