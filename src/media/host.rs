//! Remote image hosting

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::config::CloudinarySettings;
use crate::error::{Error, Result};

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload into `folder` and return the public URL
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String>;
}

/// Unsigned uploads through a Cloudinary upload preset
#[derive(Debug, Clone)]
pub struct CloudinaryHost {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryHost {
    pub fn new(settings: &CloudinarySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                settings.cloud_name
            ),
            upload_preset: settings.upload_preset.clone(),
        }
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Media(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Media(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!(
                "Image upload failed with status {}: {}",
                status, text
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Media(format!("Bad upload response: {}", e)))?;
        info!(url = %body.secure_url, "Image uploaded");
        Ok(body.secure_url)
    }
}
