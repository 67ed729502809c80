//! Content source abstraction and the HTTP implementation.
//!
//! The loader only needs two operations from the content-delivery service: an
//! idempotent manifest listing and a per-path byte fetch. The trait keeps the
//! loader testable without a network; `HttpContentSource` is the production
//! implementation.

use crate::error::{PrefetchError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Whether a manifest item is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

/// One entry of the content manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: String,
}

impl ManifestItem {
    /// Only file items participate in a bulk load.
    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }
}

/// Manifest listing returned by the content-delivery service.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub success: bool,
    pub content: Vec<ManifestItem>,
    #[serde(rename = "totalFiles")]
    pub total_files: usize,
}

/// Remote source of manifest listings and file bytes.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the manifest. Must be idempotent and side-effect-free.
    async fn fetch_manifest(&self) -> Result<Manifest>;

    /// Fetch the raw bytes for one path. A non-2xx response is a fetch
    /// failure eligible for retry.
    async fn fetch_file(&self, path: &str) -> Result<Bytes>;
}

/// Reqwest-backed content source.
pub struct HttpContentSource {
    client: Client,
    base_url: Url,
}

impl HttpContentSource {
    /// Create a source for the given base URL with default timeouts.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("cds-client-core/0.1.0")
            .build()
            .map_err(|e| PrefetchError::InvalidConfig(format!("HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| PrefetchError::InvalidConfig(format!("base URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Create a source with a preconfigured client.
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn manifest_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PrefetchError::InvalidConfig("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("content");
        Ok(url)
    }

    /// `{base}/content/file/{path}` with the path percent-encoded as a single
    /// segment, slashes included.
    fn file_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PrefetchError::InvalidConfig("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["content", "file", path]);
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    #[instrument(skip(self))]
    async fn fetch_manifest(&self) -> Result<Manifest> {
        let url = self.manifest_url()?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| PrefetchError::ManifestUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PrefetchError::ManifestUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let manifest = response
            .json::<Manifest>()
            .await
            .map_err(|e| PrefetchError::ManifestUnavailable(format!("invalid manifest: {}", e)))?;

        debug!(
            items = manifest.content.len(),
            total_files = manifest.total_files,
            "fetched manifest"
        );
        Ok(manifest)
    }

    #[instrument(skip(self))]
    async fn fetch_file(&self, path: &str) -> Result<Bytes> {
        let url = self.file_url(path)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| PrefetchError::FetchFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PrefetchError::FetchFailed {
                path: path.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.bytes().await.map_err(|e| PrefetchError::FetchFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_deserialization() {
        let json = r#"{
            "success": true,
            "totalFiles": 2,
            "content": [
                {"name": "a.png", "path": "images/a.png", "type": "file", "size": 12, "modified": "2024-01-01T00:00:00Z"},
                {"name": "images", "path": "images", "type": "directory", "size": 0, "modified": ""}
            ]
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert!(manifest.success);
        assert_eq!(manifest.total_files, 2);
        assert_eq!(manifest.content.len(), 2);
        assert!(manifest.content[0].is_file());
        assert_eq!(manifest.content[1].kind, ItemKind::Directory);
    }

    #[test]
    fn test_manifest_item_defaults() {
        let json = r#"{"name": "a.png", "path": "a.png", "type": "file"}"#;
        let item: ManifestItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.size, 0);
        assert_eq!(item.modified, "");
    }

    #[test]
    fn test_file_url_encodes_path_as_single_segment() {
        let source = HttpContentSource::new("https://cds.example.com").unwrap();
        let url = source.file_url("images/logo v2.png").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cds.example.com/content/file/images%2Flogo%20v2.png"
        );
    }

    #[test]
    fn test_manifest_url() {
        let source = HttpContentSource::new("https://cds.example.com/api/").unwrap();
        let url = source.manifest_url().unwrap();
        assert_eq!(url.as_str(), "https://cds.example.com/api/content");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HttpContentSource::new("not a url").is_err());
    }
}
