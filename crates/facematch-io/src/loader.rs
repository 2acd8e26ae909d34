//! Photo acquisition: local files and http(s) URLs decoded to RGB bitmaps.

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("timed out after {timeout:?} loading {reference}")]
    Timeout { reference: String, timeout: Duration },
}

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

impl ImageSource {
    /// Classify a reference. Web-style paths (`/imgs/a.jpg`) and relative
    /// paths resolve under `root` when one is given.
    pub fn parse(reference: &str, root: Option<&Path>) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return ImageSource::Remote(reference.to_string());
        }
        match root {
            Some(root) => ImageSource::Local(root.join(reference.trim_start_matches('/'))),
            None => ImageSource::Local(PathBuf::from(reference)),
        }
    }
}

/// Loads image references into decoded RGB bitmaps.
///
/// Remote fetches are anonymous: no cookie store and no credentials are
/// attached, so any host that serves the bytes can be analysed.
#[derive(Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    root: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            root: None,
            timeout: None,
        }
    }

    /// Directory that web-style references are served from.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Give up on a load after `timeout`. Without one, a load waits as long
    /// as the source takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolve(&self, reference: &str) -> ImageSource {
        ImageSource::parse(reference, self.root.as_deref())
    }

    /// Fetch and decode one image.
    pub async fn load(&self, reference: &str) -> Result<RgbImage, LoadError> {
        let source = self.resolve(reference);
        let fut = self.load_source(&source);

        let image = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| LoadError::Timeout {
                    reference: reference.to_string(),
                    timeout,
                })??,
            None => fut.await?,
        };

        tracing::debug!(
            reference,
            width = image.width(),
            height = image.height(),
            "image loaded"
        );
        Ok(image)
    }

    async fn load_source(&self, source: &ImageSource) -> Result<RgbImage, LoadError> {
        let bytes = match source {
            ImageSource::Local(path) => tokio::fs::read(path).await.map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?,
            ImageSource::Remote(url) => self.fetch(url).await?,
        };

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
        Ok(decoded.to_rgb8())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
