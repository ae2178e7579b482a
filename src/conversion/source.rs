//! Asset sources: where template images are fetched from.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::debug;

/// Errors fetching an asset
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed or returned an error status
    #[error("http fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The file could not be read
    #[error("file fetch failed: {0}")]
    Io(#[from] io::Error),
}

/// Fetches raw asset bytes by location.
#[automock]
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the bytes stored at `location`.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `http(s)://` assets.
#[derive(Debug, Clone, Default)]
pub struct HttpAssetSource {
    client: reqwest::Client,
}

impl HttpAssetSource {
    /// Use the given client
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        debug!(location, "fetching remote asset");

        let response = self.client.get(location).send().await?.error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}

/// Reads assets from the filesystem, relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    /// Resolve relative locations against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let path = self
            .root
            .join(location.strip_prefix("file://").unwrap_or(location));

        debug!(path = %path.display(), "reading local asset");

        Ok(tokio::fs::read(path).await?)
    }
}

/// Sends web URLs over HTTP and everything else to the filesystem.
#[derive(Debug, Clone)]
pub struct DefaultAssetSource {
    http: HttpAssetSource,
    files: FileAssetSource,
}

impl DefaultAssetSource {
    /// Resolve local assets against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            http: HttpAssetSource::default(),
            files: FileAssetSource::new(root),
        }
    }
}

#[async_trait]
impl AssetSource for DefaultAssetSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.http.fetch(location).await
        } else {
            self.files.fetch(location).await
        }
    }
}
