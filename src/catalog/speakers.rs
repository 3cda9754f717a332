use tracing::{info, instrument};

use super::{events, non_empty, required, Catalog};
use crate::error::Result;
use crate::media::StoredMedia;
use crate::model::Speaker;
use crate::sequence::{Compaction, Renumbering};
use crate::storage::Order;

#[derive(Debug, Clone, Default)]
pub struct NewSpeaker {
    pub name: String,
    pub designation: Option<String>,
    pub note: Option<String>,
    pub is_active: bool,
    pub image: Option<StoredMedia>,
}

/// Fields left `None` keep their stored value
#[derive(Debug, Clone, Default)]
pub struct SpeakerPatch {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub note: Option<String>,
    pub is_active: Option<bool>,
    pub image: Option<StoredMedia>,
}

impl Catalog {
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_speaker(&self, new: NewSpeaker) -> Result<Speaker> {
        let (image, image_url) = new.image.map(StoredMedia::into_parts).unwrap_or_default();
        self.speakers
            .insert(Speaker {
                id: 0,
                name: required(new.name, "name")?,
                designation: non_empty(new.designation),
                note: non_empty(new.note),
                image,
                image_url,
                is_active: new.is_active,
            })
            .await
    }

    /// Active speakers in id order
    pub async fn active_speakers(&self) -> Result<Vec<Speaker>> {
        let active = |s: &Speaker| s.is_active;
        self.speakers.list(Order::Ascending, Some(&active)).await
    }

    pub async fn speaker(&self, id: u32) -> Result<Speaker> {
        self.speakers.get(id).await
    }

    pub async fn update_speaker(&self, id: u32, patch: SpeakerPatch) -> Result<Speaker> {
        self.speakers
            .update(id, move |speaker| {
                if let Some(name) = non_empty(patch.name) {
                    speaker.name = name;
                }
                if let Some(designation) = non_empty(patch.designation) {
                    speaker.designation = Some(designation);
                }
                if let Some(note) = non_empty(patch.note) {
                    speaker.note = Some(note);
                }
                if let Some(active) = patch.is_active {
                    speaker.is_active = active;
                }
                if let Some(media) = patch.image {
                    let (image, image_url) = media.into_parts();
                    speaker.image = image;
                    speaker.image_url = image_url;
                }
            })
            .await
    }

    /// Delete, compact, and carry the new speaker ids into event lineups
    #[instrument(skip(self))]
    pub async fn delete_speaker(&self, id: u32) -> Result<Compaction<Speaker>> {
        let speakers = self.speakers.lock().await;
        let events = self.events.lock().await;

        let compaction = speakers.delete(id).await?;
        let touched = events::follow_speakers(&events, &compaction.renumbering).await?;
        info!(id, events = touched, "Speaker deleted");
        Ok(compaction)
    }

    pub(crate) async fn repair_speakers(&self) -> Result<Renumbering> {
        let speakers = self.speakers.lock().await;
        let events = self.events.lock().await;

        let renumbering = speakers.repair().await?;
        events::follow_speakers(&events, &renumbering).await?;
        Ok(renumbering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn speaker(name: &str, active: bool) -> NewSpeaker {
        NewSpeaker {
            name: name.to_string(),
            is_active: active,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_active_speakers_only() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_speaker(speaker("a", true)).await?;
        catalog.create_speaker(speaker("b", false)).await?;
        catalog.create_speaker(speaker("c", true)).await?;

        let names: Vec<String> = catalog
            .active_speakers()
            .await?
            .into_iter()
            .map(|s| format!("{}:{}", s.id, s.name))
            .collect();
        assert_eq!(names, vec!["1:a", "3:c"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_ignores_empty_fields() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog
            .create_speaker(NewSpeaker {
                designation: Some("Poet".to_string()),
                ..speaker("a", true)
            })
            .await?;

        let updated = catalog
            .update_speaker(
                1,
                SpeakerPatch {
                    name: Some(String::new()),
                    designation: Some("Novelist".to_string()),
                    is_active: Some(false),
                    image: Some(StoredMedia::Hosted("https://img.test/a.jpg".to_string())),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(updated.name, "a");
        assert_eq!(updated.designation.as_deref(), Some("Novelist"));
        assert!(!updated.is_active);
        assert_eq!(updated.image_url.as_deref(), Some("https://img.test/a.jpg"));
        assert!(updated.image.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_requires_name() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        let err = catalog.create_speaker(speaker(" ", true)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(catalog.speakers.next_id().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        let err = catalog
            .update_speaker(4, SpeakerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }
}
