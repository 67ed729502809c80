//! Loader configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the bulk loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Upper bound on concurrently in-flight item loads (default: 6).
    ///
    /// Exists to avoid saturating the content source and the local
    /// connection pool.
    pub concurrency: usize,

    /// Total attempts per item, first try included (default: 3).
    pub max_retries: u32,

    /// Fixed delay between attempts; none after the last (default: 1s).
    pub retry_delay: Duration,

    /// Directory where session blobs are materialized into `file://` URLs.
    pub export_dir: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            export_dir: std::env::temp_dir().join("cds-prefetch-urls"),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool bound.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the total attempts per item.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the session blob URL export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }

        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = LoaderConfig::new()
            .with_concurrency(2)
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(50));

        assert_eq!(config.concurrency, 2);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_config_validation() {
        assert!(LoaderConfig::new().with_concurrency(0).validate().is_err());
        assert!(LoaderConfig::new().with_max_retries(0).validate().is_err());
    }
}
