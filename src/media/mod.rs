//! Media processing
//!
//! Uploaded images are resized and re-encoded as JPEG before they are
//! stored. When an [`ImageHost`] is configured, speaker images and publisher
//! logos are uploaded and only the returned URL is kept.

pub mod compress;
pub mod host;

pub use compress::{ImageProcessor, ImageProfile, JpegCompressor};
pub use host::{CloudinaryHost, ImageHost};

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Where processed media ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredMedia {
    /// Bytes kept in the row
    Inline(Vec<u8>),
    /// URL returned by the image host
    Hosted(String),
}

impl StoredMedia {
    /// Split into the `(bytes, url)` pair entity rows carry
    pub fn into_parts(self) -> (Option<Vec<u8>>, Option<String>) {
        match self {
            StoredMedia::Inline(bytes) => (Some(bytes), None),
            StoredMedia::Hosted(url) => (None, Some(url)),
        }
    }
}

/// Compression plus optional hosting
#[derive(Clone)]
pub struct MediaPipeline {
    processor: Arc<dyn ImageProcessor>,
    host: Option<Arc<dyn ImageHost>>,
}

impl std::fmt::Debug for MediaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPipeline")
            .field("hosted", &self.host.is_some())
            .finish()
    }
}

impl Default for MediaPipeline {
    fn default() -> Self {
        Self::new(Arc::new(JpegCompressor), None)
    }
}

impl MediaPipeline {
    pub fn new(processor: Arc<dyn ImageProcessor>, host: Option<Arc<dyn ImageHost>>) -> Self {
        Self { processor, host }
    }

    pub fn is_hosted(&self) -> bool {
        self.host.is_some()
    }

    /// Resize and re-encode off the async runtime
    #[instrument(skip(self, bytes), fields(input = bytes.len()))]
    pub async fn compress(&self, bytes: Vec<u8>, profile: ImageProfile) -> Result<Vec<u8>> {
        let processor = self.processor.clone();
        let output = tokio::task::spawn_blocking(move || processor.process(&bytes, profile))
            .await
            .map_err(|e| Error::Internal(format!("Image task failed: {}", e)))??;
        debug!(output = output.len(), "Image compressed");
        Ok(output)
    }

    /// Compress several images, keeping their order
    pub async fn compress_all(
        &self,
        images: Vec<Vec<u8>>,
        profile: ImageProfile,
    ) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(images.len());
        for bytes in images {
            out.push(self.compress(bytes, profile).await?);
        }
        Ok(out)
    }

    /// Compress, then upload into `folder` if a host is configured
    pub async fn store(
        &self,
        bytes: Vec<u8>,
        profile: ImageProfile,
        folder: &str,
    ) -> Result<StoredMedia> {
        let compressed = self.compress(bytes, profile).await?;
        match &self.host {
            Some(host) => Ok(StoredMedia::Hosted(host.upload(compressed, folder).await?)),
            None => Ok(StoredMedia::Inline(compressed)),
        }
    }
}
