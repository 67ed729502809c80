//! Best-effort cache facade with observable state.
//!
//! This is the surface the rest of the client calls for ad-hoc reads. A cache
//! miss and a cache failure look the same here: read-oriented calls never
//! propagate errors, they log and return an absent result so the caller can
//! fall through to a fresh fetch. Write-oriented calls (`put`, `clear`,
//! `cleanup`) propagate, because their callers need to know persistence did
//! not happen.

use crate::error::Result;
use crate::store::{CacheStats, CachedObject, ObjectStore};
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Snapshot of the facade's observable state.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    pub is_initialized: bool,
    pub is_loading: bool,
    pub stats: Option<CacheStats>,
    pub error: Option<String>,
}

/// Stateful wrapper over [`ObjectStore`] publishing initialization status and
/// a stats snapshot for observers.
pub struct ContentCache {
    store: Arc<ObjectStore>,
    state: RwLock<CacheState>,
    // Serializes concurrent init() calls so at most one schema open runs.
    init_guard: tokio::sync::Mutex<()>,
}

impl ContentCache {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self {
            store,
            state: RwLock::new(CacheState::default()),
            init_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> CacheState {
        self.state.read().clone()
    }

    /// Open the store and seed the stats snapshot.
    ///
    /// Concurrent callers are deduplicated: they all wait on the same
    /// in-flight initialization and the underlying open runs at most once.
    /// On failure the error is recorded in [`CacheState`] and returned.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        let _guard = self.init_guard.lock().await;
        if self.state.read().is_initialized {
            return Ok(());
        }

        {
            let mut state = self.state.write();
            state.is_loading = true;
            state.error = None;
        }

        let result = async {
            self.store.init().await?;
            self.store.stats().await
        }
        .await;

        match result {
            Ok(stats) => {
                let mut state = self.state.write();
                state.is_initialized = true;
                state.is_loading = false;
                state.stats = Some(stats);
                info!("content cache initialized");
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.write();
                state.is_loading = false;
                state.error = Some(e.to_string());
                warn!(error = %e, "content cache initialization failed");
                Err(e)
            }
        }
    }

    /// Best-effort read; failures are treated as misses.
    pub async fn get(&self, path: &str) -> Option<Bytes> {
        match self.store.get(path).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(path, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Best-effort read with metadata; failures are treated as misses.
    pub async fn get_with_metadata(&self, path: &str) -> Option<CachedObject> {
        match self.store.get_with_metadata(path).await {
            Ok(object) => object,
            Err(e) => {
                warn!(path, error = %e, "cache metadata read failed, treating as miss");
                None
            }
        }
    }

    /// Best-effort presence check.
    pub async fn has(&self, path: &str) -> bool {
        match self.store.has(path).await {
            Ok(present) => present,
            Err(e) => {
                warn!(path, error = %e, "cache presence check failed");
                false
            }
        }
    }

    /// Persist a blob and refresh the stats snapshot.
    ///
    /// Storage failure propagates to the caller.
    pub async fn put(&self, path: &str, blob: Bytes, content_type: Option<&str>) -> Result<()> {
        self.store.put(path, blob, content_type).await?;
        self.refresh_stats().await;
        Ok(())
    }

    /// Remove all entries and reset the stats snapshot. Failure propagates.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        self.state.write().stats = None;
        Ok(())
    }

    /// Run a housekeeping sweep, refresh stats, return the deleted count.
    /// Failure propagates.
    pub async fn cleanup(&self, max_age: Option<Duration>) -> Result<u64> {
        let deleted = self.store.cleanup(max_age).await?;
        self.refresh_stats().await;
        Ok(deleted)
    }

    /// Best-effort stats read; does not touch the snapshot.
    pub async fn stats(&self) -> Option<CacheStats> {
        match self.store.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "cache stats read failed");
                None
            }
        }
    }

    /// Best-effort URL materialization for a cached blob.
    pub async fn url_for(&self, path: &str) -> Option<String> {
        match self.store.url_for(path).await {
            Ok(url) => url,
            Err(e) => {
                warn!(path, error = %e, "cache URL materialization failed");
                None
            }
        }
    }

    /// Best-effort release of a materialized URL.
    pub async fn revoke_url(&self, url: &str) {
        if let Err(e) = self.store.revoke_url(url).await {
            warn!(url, error = %e, "failed to revoke cached blob URL");
        }
    }

    async fn refresh_stats(&self) {
        match self.store.stats().await {
            Ok(stats) => self.state.write().stats = Some(stats),
            Err(e) => warn!(error = %e, "failed to refresh cache stats"),
        }
    }
}
