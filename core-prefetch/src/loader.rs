//! Bulk loader: cache-first prefetch of a content manifest.
//!
//! One load session at a time. The loader lists the manifest, filters it to
//! file items, and drains them through a fixed pool of workers sharing an
//! atomic claim cursor (pull model, so slow items do not stall a static
//! partition). Misses are fetched and persisted through the cache facade;
//! transient failures are retried with a fixed delay; items that exhaust
//! their retries land in `failed_files` without aborting the batch.

use crate::config::LoaderConfig;
use crate::error::{PrefetchError, Result};
use crate::source::{ContentSource, ManifestItem};
use bytes::Bytes;
use core_store::facade::ContentCache;
use core_store::store::CacheStats;
use core_store::urls::BlobUrlExporter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const LISTING_MESSAGE: &str = "Loading content list...";

/// Observable state of one bulk-load invocation.
///
/// `current_file` is advisory only: workers overwrite it last-write-wins and
/// it carries no ordering guarantee.
#[derive(Debug, Clone, Default)]
pub struct LoadSession {
    pub is_loading: bool,
    pub progress: u8,
    pub total_files: usize,
    pub loaded_files: usize,
    pub current_file: String,
    pub error: Option<String>,
    pub is_complete: bool,
    pub failed_files: Vec<String>,
}

#[derive(Default)]
struct SessionInner {
    session: LoadSession,
    /// Session-local mirror of loaded blobs. Not authoritative; the durable
    /// store is.
    blobs: HashMap<String, Bytes>,
}

/// Shared handles a worker needs to process items.
#[derive(Clone)]
struct WorkerContext {
    cache: Arc<ContentCache>,
    source: Arc<dyn ContentSource>,
    inner: Arc<Mutex<SessionInner>>,
    files: Arc<Vec<ManifestItem>>,
    cursor: Arc<AtomicUsize>,
    config: LoaderConfig,
    token: CancellationToken,
}

/// Prefetches a manifest of content with bounded concurrency and retry.
pub struct BulkLoader {
    cache: Arc<ContentCache>,
    source: Arc<dyn ContentSource>,
    config: LoaderConfig,
    exporter: BlobUrlExporter,
    inner: Arc<Mutex<SessionInner>>,
    cancel: Mutex<CancellationToken>,
}

impl BulkLoader {
    pub fn new(
        cache: Arc<ContentCache>,
        source: Arc<dyn ContentSource>,
        config: LoaderConfig,
    ) -> Self {
        let exporter = BlobUrlExporter::new(config.export_dir.clone());
        Self {
            cache,
            source,
            config,
            exporter,
            inner: Arc::new(Mutex::new(SessionInner::default())),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Run one bulk load to completion.
    ///
    /// Returns `Ok(())` when the batch drains, even if individual items
    /// exhausted their retries; inspect [`BulkLoader::get_failed_files`] for
    /// those. Errors only for a failed manifest listing, cancellation, or a
    /// worker panic — the `failed` states.
    #[instrument(skip(self))]
    pub async fn start_loading(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(PrefetchError::InvalidConfig)?;

        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();

        {
            let mut inner = self.inner.lock();
            inner.session.is_loading = true;
            inner.session.progress = 0;
            inner.session.loaded_files = 0;
            inner.session.error = None;
            inner.session.is_complete = false;
            inner.session.failed_files.clear();
            inner.blobs.clear();
        }

        // Best-effort: a cache that cannot open degrades every item to the
        // fetch path, it does not abort the load.
        if let Err(e) = self.cache.init().await {
            warn!(error = %e, "cache init failed, continuing without warm cache");
        }

        self.inner.lock().session.current_file = LISTING_MESSAGE.to_string();

        let manifest = match self.source.fetch_manifest().await {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(error = %e, "manifest listing failed");
                let mut inner = self.inner.lock();
                inner.session.is_loading = false;
                inner.session.error = Some(e.to_string());
                return Err(e);
            }
        };

        let files: Vec<ManifestItem> = manifest
            .content
            .into_iter()
            .filter(ManifestItem::is_file)
            .collect();
        let total = files.len();
        self.inner.lock().session.total_files = total;
        info!(total_files = total, "manifest listed, starting prefetch");

        let files = Arc::new(files);
        let cursor = Arc::new(AtomicUsize::new(0));
        let worker_count = self.config.concurrency.min(total);
        let mut handles = Vec::with_capacity(worker_count);

        for worker in 0..worker_count {
            let ctx = WorkerContext {
                cache: self.cache.clone(),
                source: self.source.clone(),
                inner: self.inner.clone(),
                files: files.clone(),
                cursor: cursor.clone(),
                config: self.config.clone(),
                token: token.clone(),
            };
            handles.push(tokio::spawn(run_worker(worker, ctx)));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "prefetch worker panicked");
                let mut inner = self.inner.lock();
                inner.session.is_loading = false;
                inner.session.error = Some(e.to_string());
                return Err(PrefetchError::WorkerFailed(e.to_string()));
            }
        }

        if token.is_cancelled() {
            let mut inner = self.inner.lock();
            inner.session.is_loading = false;
            inner.session.error = Some("load cancelled".to_string());
            return Err(PrefetchError::Cancelled);
        }

        let mut inner = self.inner.lock();
        let failed = inner.session.failed_files.len();
        inner.session.is_loading = false;
        // Forced to 100 regardless of per-item rounding.
        inner.session.progress = 100;
        inner.session.is_complete = true;
        inner.session.current_file = if failed > 0 {
            format!("Loading complete! ({} files failed)", failed)
        } else {
            "Loading complete!".to_string()
        };
        info!(
            loaded = inner.session.loaded_files,
            failed, "prefetch finished"
        );
        Ok(())
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> LoadSession {
        self.inner.lock().session.clone()
    }

    /// Blob pulled during this session, or `None`. Session-local: reflects
    /// only what this load touched, not the durable cache.
    pub fn get_file(&self, path: &str) -> Option<Bytes> {
        self.inner.lock().blobs.get(path).cloned()
    }

    /// Materialize a session blob into a `file://` URL.
    ///
    /// The caller owns the handle and must release it via
    /// [`BulkLoader::revoke_file_url`].
    pub async fn get_file_url(&self, path: &str) -> Option<String> {
        let blob = self.get_file(path)?;
        match self.exporter.export(path, &blob).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(path, error = %e, "failed to materialize session blob");
                None
            }
        }
    }

    /// Release a URL handed out by [`BulkLoader::get_file_url`].
    pub async fn revoke_file_url(&self, url: &str) {
        if let Err(e) = self.exporter.revoke(url).await {
            warn!(url, error = %e, "failed to revoke session blob URL");
        }
    }

    /// Items that exhausted their retries in this session.
    pub fn get_failed_files(&self) -> Vec<String> {
        self.inner.lock().session.failed_files.clone()
    }

    /// Discard the session back to its initial empty shape.
    pub fn reset(&self) {
        *self.inner.lock() = SessionInner::default();
    }

    /// Abort the in-flight load at the next suspension point.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    // Cache-management passthroughs. These delegate to the facade and never
    // touch the session map.

    pub async fn clear_cache(&self) -> Result<()> {
        Ok(self.cache.clear().await?)
    }

    pub async fn get_cache_stats(&self) -> Option<CacheStats> {
        self.cache.stats().await
    }

    pub async fn cleanup_cache(&self, max_age: Option<Duration>) -> Result<u64> {
        Ok(self.cache.cleanup(max_age).await?)
    }

    pub async fn get_cached_file_url(&self, path: &str) -> Option<String> {
        self.cache.url_for(path).await
    }
}

/// Worker loop: claim the next unprocessed item until the manifest drains.
async fn run_worker(worker: usize, ctx: WorkerContext) {
    loop {
        if ctx.token.is_cancelled() {
            debug!(worker, "worker stopping, load cancelled");
            break;
        }

        let index = ctx.cursor.fetch_add(1, Ordering::SeqCst);
        let Some(item) = ctx.files.get(index) else {
            break;
        };

        process_item(&ctx, item).await;

        let mut inner = ctx.inner.lock();
        inner.session.loaded_files += 1;
        let total = inner.session.total_files.max(1);
        inner.session.progress = (inner.session.loaded_files * 100 / total) as u8;
    }
}

/// Load one item: cache hit, or fetch-and-persist with retry.
async fn process_item(ctx: &WorkerContext, item: &ManifestItem) {
    ctx.inner.lock().session.current_file = item.name.clone();

    if let Some(blob) = ctx.cache.get(&item.path).await {
        debug!(path = %item.path, "cache hit");
        ctx.inner.lock().blobs.insert(item.path.clone(), blob);
        return;
    }

    for attempt in 1..=ctx.config.max_retries {
        match fetch_and_persist(ctx, item).await {
            Ok(blob) => {
                ctx.inner.lock().blobs.insert(item.path.clone(), blob);
                return;
            }
            Err(e) => {
                warn!(
                    path = %item.path,
                    attempt,
                    max_retries = ctx.config.max_retries,
                    error = %e,
                    "failed to load file"
                );

                if attempt < ctx.config.max_retries {
                    tokio::select! {
                        _ = sleep(ctx.config.retry_delay) => {}
                        _ = ctx.token.cancelled() => {
                            debug!(path = %item.path, "retry abandoned, load cancelled");
                            return;
                        }
                    }
                } else {
                    error!(
                        path = %item.path,
                        attempts = ctx.config.max_retries,
                        "giving up on file"
                    );
                    ctx.inner.lock().session.failed_files.push(item.path.clone());
                }
            }
        }
    }
}

/// One attempt: fetch remote bytes, then persist through the facade. A
/// persistence failure fails the attempt just like a fetch failure.
async fn fetch_and_persist(ctx: &WorkerContext, item: &ManifestItem) -> Result<Bytes> {
    let blob = ctx.source.fetch_file(&item.path).await?;
    ctx.cache.put(&item.path, blob.clone(), None).await?;
    Ok(blob)
}
