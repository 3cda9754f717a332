//! Gallery and partner images

use super::Catalog;
use crate::error::{Error, Result};
use crate::model::{GalleryImage, PartnerImage};
use crate::sequence::Compaction;
use crate::storage::Order;

/// Images accepted by one bulk upload
pub const MAX_BATCH: usize = 10;

fn check_batch(len: usize) -> Result<()> {
    match len {
        0 => Err(Error::InvalidArgument("No images uploaded".to_string())),
        n if n > MAX_BATCH => Err(Error::InvalidArgument(format!(
            "At most {} images per upload",
            MAX_BATCH
        ))),
        _ => Ok(()),
    }
}

impl Catalog {
    /// Append images with consecutive ids, in upload order
    pub async fn add_gallery_images(&self, images: Vec<Vec<u8>>) -> Result<Vec<GalleryImage>> {
        check_batch(images.len())?;
        let rows = images.into_iter().map(GalleryImage::new).collect();
        self.gallery.lock().await.insert_many(rows).await
    }

    pub async fn gallery_images(&self) -> Result<Vec<GalleryImage>> {
        self.gallery.list(Order::Ascending, None).await
    }

    pub async fn replace_gallery_image(&self, id: u32, image: Vec<u8>) -> Result<GalleryImage> {
        self.gallery
            .update(id, move |row| row.image = Some(image))
            .await
    }

    pub async fn delete_gallery_image(&self, id: u32) -> Result<Compaction<GalleryImage>> {
        self.gallery.delete(id).await
    }

    pub async fn add_partner_images(&self, images: Vec<Vec<u8>>) -> Result<Vec<PartnerImage>> {
        check_batch(images.len())?;
        let rows = images.into_iter().map(PartnerImage::new).collect();
        self.partners.lock().await.insert_many(rows).await
    }

    pub async fn partner_images(&self) -> Result<Vec<PartnerImage>> {
        self.partners.list(Order::Ascending, None).await
    }

    pub async fn delete_partner_image(&self, id: u32) -> Result<Compaction<PartnerImage>> {
        self.partners.delete(id).await
    }
}
