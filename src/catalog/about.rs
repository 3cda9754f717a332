use chrono::{DateTime, Utc};

use super::{non_empty, required, Catalog};
use crate::error::Result;
use crate::model::AboutEvent;
use crate::storage::Order;

#[derive(Debug, Clone)]
pub struct NewAboutEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    pub video: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct AboutEventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub video: Option<Vec<u8>>,
}

impl Catalog {
    pub async fn create_about_event(&self, new: NewAboutEvent) -> Result<AboutEvent> {
        self.about
            .insert(AboutEvent {
                id: 0,
                title: required(new.title, "title")?,
                description: non_empty(new.description),
                location: non_empty(new.location),
                date: new.date,
                video: new.video,
            })
            .await
    }

    /// Ordered by date, then id
    pub async fn about_events(&self) -> Result<Vec<AboutEvent>> {
        let mut rows = self.about.list(Order::Ascending, None).await?;
        rows.sort_by_key(|e| (e.date, e.id));
        Ok(rows)
    }

    pub async fn update_about_event(&self, id: u32, patch: AboutEventPatch) -> Result<AboutEvent> {
        self.about
            .update(id, move |event| {
                if let Some(title) = non_empty(patch.title) {
                    event.title = title;
                }
                if let Some(description) = non_empty(patch.description) {
                    event.description = Some(description);
                }
                if let Some(location) = non_empty(patch.location) {
                    event.location = Some(location);
                }
                if let Some(date) = patch.date {
                    event.date = date;
                }
                if let Some(video) = patch.video {
                    event.video = Some(video);
                }
            })
            .await
    }

    pub async fn delete_about_event(&self, id: u32) -> Result<AboutEvent> {
        self.about.lock().await.remove(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(title: &str, day: u32) -> NewAboutEvent {
        NewAboutEvent {
            title: title.to_string(),
            description: None,
            location: Some("Hall A".to_string()),
            date: Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap(),
            video: None,
        }
    }

    #[tokio::test]
    async fn test_listing_is_ordered_by_date() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_about_event(entry("late", 20)).await?;
        catalog.create_about_event(entry("early", 2)).await?;

        let titles: Vec<String> = catalog
            .about_events()
            .await?
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["early", "late"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_update() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog.create_about_event(entry("fair", 1)).await?;
        let updated = catalog
            .update_about_event(
                1,
                AboutEventPatch {
                    location: Some(String::new()),
                    video: Some(vec![0, 0, 0, 24]),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(updated.location.as_deref(), Some("Hall A"));
        assert_eq!(updated.video, Some(vec![0, 0, 0, 24]));
        Ok(())
    }
}
