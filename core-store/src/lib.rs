//! # Content Store Module
//!
//! Owns the durable content cache database and provides the cache facade
//! used by the rest of the client.
//!
//! ## Overview
//!
//! This module manages:
//! - The SQLite-backed object store for binary assets (`ObjectStore`)
//! - The best-effort cache facade with observable state (`ContentCache`)
//! - Content-type inference from file extensions (`mime`)
//! - Materialization of cached blobs into local `file://` URLs (`urls`)

pub mod db;
pub mod error;
pub mod facade;
pub mod mime;
pub mod store;
pub mod urls;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use facade::{CacheState, ContentCache};
pub use store::{CacheStats, CachedObject, EntryInfo, ObjectStore, StoreOptions};
pub use urls::BlobUrlExporter;
