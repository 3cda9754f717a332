use super::{non_empty, Catalog};
use crate::error::Result;
use crate::model::Banner;
use crate::sequence::Compaction;
use crate::storage::Order;

#[derive(Debug, Clone, Default)]
pub struct NewBanner {
    pub text: Option<String>,
    pub content: Option<String>,
    pub image: Option<Vec<u8>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BannerPatch {
    pub text: Option<String>,
    pub content: Option<String>,
    pub image: Option<Vec<u8>>,
    pub is_active: Option<bool>,
}

impl Catalog {
    pub async fn create_banner(&self, new: NewBanner) -> Result<Banner> {
        self.banners
            .insert(Banner {
                id: 0,
                text: non_empty(new.text),
                content: non_empty(new.content),
                image: new.image,
                is_active: new.is_active,
            })
            .await
    }

    pub async fn active_banners(&self) -> Result<Vec<Banner>> {
        let active = |b: &Banner| b.is_active;
        self.banners.list(Order::Ascending, Some(&active)).await
    }

    pub async fn update_banner(&self, id: u32, patch: BannerPatch) -> Result<Banner> {
        self.banners
            .update(id, move |banner| {
                if let Some(text) = non_empty(patch.text) {
                    banner.text = Some(text);
                }
                if let Some(content) = non_empty(patch.content) {
                    banner.content = Some(content);
                }
                if let Some(image) = patch.image {
                    banner.image = Some(image);
                }
                if let Some(active) = patch.is_active {
                    banner.is_active = active;
                }
            })
            .await
    }

    pub async fn delete_banner(&self, id: u32) -> Result<Compaction<Banner>> {
        self.banners.delete(id).await
    }
}
