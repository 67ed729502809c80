use thiserror::Error;

/// Errors produced by the durable object store and its facade.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing storage could not be opened.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A read transaction failed for a specific entry.
    #[error("Read failed for {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// A write transaction failed for a specific entry.
    #[error("Write failed for {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// Any other database failure (clear, stats, cleanup).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while materializing or revoking a blob URL.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL handle that was not produced by [`crate::urls::BlobUrlExporter`].
    #[error("Invalid URL handle: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
