//! Integration tests for the best-effort cache facade.

use bytes::Bytes;
use core_store::db::create_test_pool;
use core_store::facade::ContentCache;
use core_store::store::{ObjectStore, StoreOptions};
use std::sync::Arc;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn test_options() -> StoreOptions {
    StoreOptions::new()
        .with_export_dir(std::env::temp_dir().join(format!("facade-tests-{}", Uuid::new_v4())))
}

async fn test_cache() -> ContentCache {
    init_tracing();
    let pool = create_test_pool().await.unwrap();
    let store = Arc::new(ObjectStore::new(pool, test_options()));
    ContentCache::new(store)
}

#[tokio::test]
async fn test_init_populates_state() {
    let cache = test_cache().await;

    let before = cache.state();
    assert!(!before.is_initialized);
    assert!(before.stats.is_none());

    cache.init().await.unwrap();

    let after = cache.state();
    assert!(after.is_initialized);
    assert!(!after.is_loading);
    assert!(after.error.is_none());
    assert_eq!(after.stats.unwrap().total_files, 0);
}

#[tokio::test]
async fn test_concurrent_init_is_deduplicated() {
    let cache = Arc::new(test_cache().await);

    let a = cache.clone();
    let b = cache.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.init().await }),
        tokio::spawn(async move { b.init().await }),
    );

    assert!(ra.unwrap().is_ok());
    assert!(rb.unwrap().is_ok());
    assert!(cache.state().is_initialized);
}

#[tokio::test]
async fn test_read_failures_surface_as_miss() {
    // No init(): the schema does not exist, so every store call errors.
    let cache = test_cache().await;

    assert!(cache.get("a.png").await.is_none());
    assert!(cache.get_with_metadata("a.png").await.is_none());
    assert!(!cache.has("a.png").await);
    assert!(cache.stats().await.is_none());
    assert!(cache.url_for("a.png").await.is_none());
}

#[tokio::test]
async fn test_write_failures_propagate() {
    let cache = test_cache().await;

    let result = cache.put("a.png", Bytes::from_static(b"abc"), None).await;
    assert!(result.is_err());

    assert!(cache.clear().await.is_err());
    assert!(cache.cleanup(None).await.is_err());
}

#[tokio::test]
async fn test_put_refreshes_stats_snapshot() {
    let cache = test_cache().await;
    cache.init().await.unwrap();

    cache
        .put("a.png", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    let stats = cache.state().stats.unwrap();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.total_size, 3);

    assert_eq!(
        cache.get("a.png").await.unwrap(),
        Bytes::from_static(b"abc")
    );
    assert!(cache.has("a.png").await);
}

#[tokio::test]
async fn test_clear_resets_stats_snapshot() {
    let cache = test_cache().await;
    cache.init().await.unwrap();

    cache
        .put("a.png", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();
    assert!(cache.state().stats.is_some());

    cache.clear().await.unwrap();
    assert!(cache.state().stats.is_none());
    assert!(cache.get("a.png").await.is_none());
}

#[tokio::test]
async fn test_cleanup_reports_count() {
    let cache = test_cache().await;
    cache.init().await.unwrap();

    cache
        .put("a.png", Bytes::from_static(b"abc"), None)
        .await
        .unwrap();

    // Nothing is old enough for the default seven-day horizon.
    assert_eq!(cache.cleanup(None).await.unwrap(), 0);
    assert_eq!(cache.state().stats.unwrap().total_files, 1);
}

#[tokio::test]
async fn test_url_for_and_revoke_are_best_effort() {
    let cache = test_cache().await;
    cache.init().await.unwrap();

    cache
        .put("a.png", Bytes::from_static(b"pngbytes"), None)
        .await
        .unwrap();

    let url = cache.url_for("a.png").await.unwrap();
    let path = url.strip_prefix("file://").unwrap().to_string();
    assert!(tokio::fs::metadata(&path).await.is_ok());

    cache.revoke_url(&url).await;
    assert!(tokio::fs::metadata(&path).await.is_err());

    // Double revoke is swallowed by the facade.
    cache.revoke_url(&url).await;
}
