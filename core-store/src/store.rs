//! Durable object store for binary content, backed by SQLite.
//!
//! One row per logical path. A put replaces the whole row, metadata and
//! timestamp included. Reads are gated by a validity window: entries older
//! than the configured horizon, or with an empty blob, read as absent even
//! though the row stays on disk until [`ObjectStore::cleanup`] removes it.

use crate::error::{Result, StoreError};
use crate::mime;
use crate::urls::BlobUrlExporter;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default validity horizon for reads: one year.
const DEFAULT_MAX_ENTRY_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default housekeeping horizon for [`ObjectStore::cleanup`]: seven days.
///
/// Intentionally distinct from the validity horizon; cleanup removes rows the
/// read path would still consider valid.
const DEFAULT_CLEANUP_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A cached payload together with its stored metadata.
#[derive(Debug, Clone)]
pub struct CachedObject {
    pub blob: Bytes,
    pub content_type: String,
    pub size: u64,
}

/// Metadata of a stored row, without the payload. Used by housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryInfo {
    pub path: String,
    pub timestamp: i64,
    pub size: u64,
    pub content_type: String,
}

/// Aggregate over the currently *valid* entries, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of valid entries.
    pub total_files: u64,

    /// Sum of their sizes in bytes.
    pub total_size: u64,

    /// Oldest valid timestamp (epoch ms), 0 when empty.
    pub oldest_file: i64,

    /// Newest valid timestamp (epoch ms), 0 when empty.
    pub newest_file: i64,
}

impl CacheStats {
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    /// Average bytes per valid entry.
    pub fn average_file_size(&self) -> u64 {
        if self.total_files == 0 {
            0
        } else {
            self.total_size / self.total_files
        }
    }
}

/// Tunables for the object store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Validity horizon: entries older than this read as absent.
    pub max_entry_age: Duration,

    /// Default horizon for [`ObjectStore::cleanup`] when none is given.
    pub cleanup_max_age: Duration,

    /// Directory where [`ObjectStore::url_for`] materializes blobs.
    pub export_dir: PathBuf,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_entry_age: DEFAULT_MAX_ENTRY_AGE,
            cleanup_max_age: DEFAULT_CLEANUP_MAX_AGE,
            export_dir: std::env::temp_dir().join("cds-content-urls"),
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the validity horizon for reads.
    pub fn with_max_entry_age(mut self, age: Duration) -> Self {
        self.max_entry_age = age;
        self
    }

    /// Set the default cleanup horizon.
    pub fn with_cleanup_max_age(mut self, age: Duration) -> Self {
        self.cleanup_max_age = age;
        self
    }

    /// Set the blob URL export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }
}

/// Persistent keyed store of binary blobs with metadata.
///
/// The store is the only component that touches durable storage. It is built
/// from an explicit pool (see [`crate::db::create_pool`]) and passed by
/// reference to whatever needs it; there is no ambient global handle.
pub struct ObjectStore {
    pool: Pool<Sqlite>,
    options: StoreOptions,
    exporter: BlobUrlExporter,
}

impl ObjectStore {
    pub fn new(pool: Pool<Sqlite>, options: StoreOptions) -> Self {
        let exporter = BlobUrlExporter::new(options.export_dir.clone());
        Self {
            pool,
            options,
            exporter,
        }
    }

    /// Create the keyed collection and its secondary indexes if absent.
    ///
    /// Idempotent on success; safe to call on every startup.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS content_entries (
                path TEXT PRIMARY KEY NOT NULL,
                blob BLOB NOT NULL,
                timestamp INTEGER NOT NULL,
                size INTEGER NOT NULL,
                content_type TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON content_entries(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_entries_size ON content_entries(size)",
        ];

        for sql in statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        debug!("object store schema ready");
        Ok(())
    }

    /// Fetch the payload at `path`, or `None` if missing or invalid.
    ///
    /// Expired and never-stored entries are indistinguishable to callers.
    #[instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let row = self.fetch_row(path).await?;
        Ok(row.and_then(|row| self.valid_blob(&row)))
    }

    /// Like [`ObjectStore::get`], additionally returning stored metadata.
    #[instrument(skip(self))]
    pub async fn get_with_metadata(&self, path: &str) -> Result<Option<CachedObject>> {
        let Some(row) = self.fetch_row(path).await? else {
            return Ok(None);
        };

        Ok(self.valid_blob(&row).map(|blob| CachedObject {
            blob,
            content_type: row.get("content_type"),
            size: row.get::<i64, _>("size") as u64,
        }))
    }

    /// True iff [`ObjectStore::get`] would return a payload.
    pub async fn has(&self, path: &str) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }

    /// Store `blob` at `path`, replacing any prior record wholesale.
    ///
    /// Size is computed from the blob, the content type resolves to the
    /// explicit value or is inferred from the path's extension, and the
    /// timestamp is stamped with the current time.
    #[instrument(skip(self, blob))]
    pub async fn put(&self, path: &str, blob: Bytes, content_type: Option<&str>) -> Result<()> {
        let content_type = content_type
            .map(str::to_owned)
            .unwrap_or_else(|| mime::detect_content_type(path).to_owned());
        let size = blob.len() as i64;

        sqlx::query(
            "INSERT OR REPLACE INTO content_entries (path, blob, timestamp, size, content_type)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(path)
        .bind(blob.to_vec())
        .bind(now_ms())
        .bind(size)
        .bind(&content_type)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed {
            path: path.to_string(),
            source: e,
        })?;

        debug!(path, size, content_type, "stored entry");
        Ok(())
    }

    /// Remove the record at `path`; no error if absent.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        sqlx::query("DELETE FROM content_entries WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::WriteFailed {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Remove all records unconditionally.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM content_entries")
            .execute(&self.pool)
            .await?;

        info!("cache cleared");
        Ok(())
    }

    /// Aggregate statistics over the valid entries.
    ///
    /// O(n) in stored rows; called on init, put and cleanup rather than per
    /// read.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CacheStats> {
        let cutoff = now_ms() - self.options.max_entry_age.as_millis() as i64;

        let row = sqlx::query(
            "SELECT COUNT(*) AS total_files,
                    COALESCE(SUM(size), 0) AS total_size,
                    COALESCE(MIN(timestamp), 0) AS oldest_file,
                    COALESCE(MAX(timestamp), 0) AS newest_file
             FROM content_entries
             WHERE timestamp > ? AND size > 0",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(CacheStats {
            total_files: row.get::<i64, _>("total_files") as u64,
            total_size: row.get::<i64, _>("total_size") as u64,
            oldest_file: row.get("oldest_file"),
            newest_file: row.get("newest_file"),
        })
    }

    /// Metadata of every stored row, valid or not. Housekeeping view.
    pub async fn entries(&self) -> Result<Vec<EntryInfo>> {
        let rows = sqlx::query(
            "SELECT path, timestamp, size, content_type
             FROM content_entries ORDER BY timestamp",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EntryInfo {
                path: row.get("path"),
                timestamp: row.get("timestamp"),
                size: row.get::<i64, _>("size") as u64,
                content_type: row.get("content_type"),
            })
            .collect())
    }

    /// Remove every record strictly older than `now - max_age` and return the
    /// count removed. Rows at the boundary survive.
    ///
    /// Defaults to the housekeeping horizon from [`StoreOptions`], which is
    /// deliberately shorter than the read validity horizon.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, max_age: Option<Duration>) -> Result<u64> {
        let max_age = max_age.unwrap_or(self.options.cleanup_max_age);
        let cutoff = now_ms() - max_age.as_millis() as i64;

        let result = sqlx::query("DELETE FROM content_entries WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!(deleted, cutoff, "cache cleanup finished");
        Ok(deleted)
    }

    /// Materialize the blob at `path` into a local `file://` URL.
    ///
    /// Returns `None` for missing or invalid entries. The caller owns the
    /// handle and must release it via [`ObjectStore::revoke_url`].
    #[instrument(skip(self))]
    pub async fn url_for(&self, path: &str) -> Result<Option<String>> {
        let Some(blob) = self.get(path).await? else {
            return Ok(None);
        };

        let url = self.exporter.export(path, &blob).await?;
        Ok(Some(url))
    }

    /// Release a URL previously materialized by [`ObjectStore::url_for`].
    ///
    /// Not idempotent: revoking the same handle twice is undefined.
    pub async fn revoke_url(&self, url: &str) -> Result<()> {
        self.exporter.revoke(url).await
    }

    async fn fetch_row(&self, path: &str) -> Result<Option<SqliteRow>> {
        sqlx::query(
            "SELECT path, blob, timestamp, size, content_type
             FROM content_entries WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::ReadFailed {
            path: path.to_string(),
            source: e,
        })
    }

    /// Validity gate: young enough and non-empty.
    fn valid_blob(&self, row: &SqliteRow) -> Option<Bytes> {
        let timestamp: i64 = row.get("timestamp");
        let size: i64 = row.get("size");

        let age = now_ms() - timestamp;
        if age < self.options.max_entry_age.as_millis() as i64 && size > 0 {
            let blob: Vec<u8> = row.get("blob");
            Some(Bytes::from(blob))
        } else {
            None
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = StoreOptions::default();
        assert_eq!(options.max_entry_age, DEFAULT_MAX_ENTRY_AGE);
        assert_eq!(options.cleanup_max_age, DEFAULT_CLEANUP_MAX_AGE);
    }

    #[test]
    fn test_options_builder() {
        let options = StoreOptions::new()
            .with_max_entry_age(Duration::from_secs(60))
            .with_cleanup_max_age(Duration::from_secs(30))
            .with_export_dir("/tmp/exports");

        assert_eq!(options.max_entry_age, Duration::from_secs(60));
        assert_eq!(options.cleanup_max_age, Duration::from_secs(30));
        assert_eq!(options.export_dir, PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn test_stats_helpers() {
        let empty = CacheStats::default();
        assert!(empty.is_empty());
        assert_eq!(empty.average_file_size(), 0);

        let stats = CacheStats {
            total_files: 4,
            total_size: 100,
            oldest_file: 1,
            newest_file: 2,
        };
        assert!(!stats.is_empty());
        assert_eq!(stats.average_file_size(), 25);
    }
}
