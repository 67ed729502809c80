//! # Bulk Prefetch Module
//!
//! Drives the cache-first bulk load of a content manifest.
//!
//! ## Overview
//!
//! The loader asks the remote content source for its manifest, then pulls
//! every file item through a bounded pool of workers: cached blobs are served
//! locally, misses are fetched, persisted through the cache facade, and
//! retried on transient failure. Items that exhaust their retries are
//! accumulated rather than aborting the batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     BulkLoader                         │
//! │  - start_loading()                     │
//! │  - session() / get_file()              │
//! │  - cancel() / reset()                  │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> ContentSource (manifest + bytes)
//!          └──> ContentCache  (core-store facade)
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod source;

pub use config::LoaderConfig;
pub use error::{PrefetchError, Result};
pub use loader::{BulkLoader, LoadSession};
pub use source::{ContentSource, HttpContentSource, ItemKind, Manifest, ManifestItem};
