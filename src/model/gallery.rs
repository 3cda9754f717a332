//! Gallery and partner logo images

use serde::{Deserialize, Serialize};

use super::{optional_data_url, JPEG_MIME};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: u32,
    #[serde(default, with = "super::blob")]
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerImage {
    pub id: u32,
    #[serde(default, with = "super::blob")]
    pub image: Option<Vec<u8>>,
}

/// `{ id, image }` with the image as a data URL
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: u32,
    pub image: Option<String>,
}

impl GalleryImage {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            id: 0,
            image: Some(image),
        }
    }

    pub fn view(&self) -> ImageView {
        ImageView {
            id: self.id,
            image: optional_data_url(JPEG_MIME, &self.image),
        }
    }
}

impl PartnerImage {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            id: 0,
            image: Some(image),
        }
    }

    pub fn view(&self) -> ImageView {
        ImageView {
            id: self.id,
            image: optional_data_url(JPEG_MIME, &self.image),
        }
    }
}

super::impl_record!(GalleryImage, PartnerImage);
