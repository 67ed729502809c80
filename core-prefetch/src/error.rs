use core_store::StoreError;
use thiserror::Error;

/// Errors that can occur while prefetching content.
#[derive(Error, Debug)]
pub enum PrefetchError {
    /// The manifest listing could not be fetched. Fatal to a load session.
    #[error("Manifest unavailable: {0}")]
    ManifestUnavailable(String),

    /// A per-item byte fetch failed. Transient and eligible for retry.
    #[error("Fetch failed for {path}: {reason}")]
    FetchFailed { path: String, reason: String },

    /// The cache facade reported a persistence failure.
    #[error("Cache error: {0}")]
    Cache(#[from] StoreError),

    /// The load was cancelled before completing.
    #[error("Load cancelled")]
    Cancelled,

    /// A worker task panicked; the batch is abandoned.
    #[error("Worker task failed: {0}")]
    WorkerFailed(String),

    /// The loader configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PrefetchError {
    /// Returns `true` if the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, PrefetchError::FetchFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, PrefetchError>;
