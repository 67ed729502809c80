//! Materialization of blobs into locally dereferenceable `file://` URLs.
//!
//! Playback and rendering code consumes local URLs rather than raw buffers.
//! A materialized URL is a scoped resource: acquire with
//! [`BlobUrlExporter::export`], release with [`BlobUrlExporter::revoke`].
//! An unreleased URL leaks a file for the lifetime of the export directory.

use crate::error::{Result, StoreError};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Writes blobs into an export directory and hands out `file://` handles.
#[derive(Debug, Clone)]
pub struct BlobUrlExporter {
    dir: PathBuf,
}

impl BlobUrlExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `blob` to a uniquely named file and return a `file://` URL.
    ///
    /// The original extension of `source_path` is preserved so consumers that
    /// sniff by suffix keep working.
    pub async fn export(&self, source_path: &str, blob: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = match extension_of(source_path) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let target = self.dir.join(file_name);

        tokio::fs::write(&target, blob).await?;
        let absolute = tokio::fs::canonicalize(&target).await?;

        debug!(source_path, target = %absolute.display(), "materialized blob URL");
        Ok(format!("file://{}", absolute.display()))
    }

    /// Delete the file behind a previously exported URL.
    ///
    /// Calling this twice on the same handle is undefined; the second call
    /// will report the missing file as an I/O error.
    pub async fn revoke(&self, url: &str) -> Result<()> {
        let path = url
            .strip_prefix("file://")
            .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?;

        tokio::fs::remove_file(path).await?;
        debug!(url, "revoked blob URL");
        Ok(())
    }
}

/// Extension after the final `.`, if it does not span a path separator.
fn extension_of(path: &str) -> Option<&str> {
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') || ext.contains('\\') {
        None
    } else {
        Some(ext)
    }
}
