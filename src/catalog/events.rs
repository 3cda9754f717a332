use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::instrument;

use super::{non_empty, required, Catalog};
use crate::error::{Error, Result};
use crate::model::content::EventView;
use crate::model::{Event, Speaker};
use crate::sequence::{Compaction, Renumbering, TableGuard};
use crate::storage::Order;

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub day: String,
    pub date: DateTime<Utc>,
    pub event_name: String,
    pub event_description: Option<String>,
    pub speaker_ids: Vec<u32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub day: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub event_description: Option<String>,
    /// Replaces the whole lineup when present
    pub speaker_ids: Option<Vec<u32>>,
    pub is_active: Option<bool>,
}

impl Catalog {
    #[instrument(skip(self, new), fields(name = %new.event_name))]
    pub async fn create_event(&self, new: NewEvent) -> Result<Event> {
        let speakers = self.speakers.lock().await;
        let events = self.events.lock().await;

        let speaker_ids = checked_lineup(&speakers, new.speaker_ids).await?;
        events
            .insert(Event {
                id: 0,
                day: required(new.day, "day")?,
                date: new.date,
                event_name: required(new.event_name, "eventName")?,
                event_description: non_empty(new.event_description),
                speaker_ids,
                is_active: new.is_active,
            })
            .await
    }

    /// Active events in id order with their speakers
    pub async fn active_events(&self) -> Result<Vec<EventView>> {
        let speakers = self.speakers.lock().await;
        let active = |e: &Event| e.is_active;
        let events = self.events.list(Order::Ascending, Some(&active)).await?;
        let by_id: HashMap<u32, Speaker> = speakers
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(events
            .into_iter()
            .map(|event| EventView {
                speakers: event
                    .speaker_ids
                    .iter()
                    .filter_map(|id| by_id.get(id).map(Speaker::summary))
                    .collect(),
                event,
            })
            .collect())
    }

    pub async fn update_event(&self, id: u32, patch: EventPatch) -> Result<Event> {
        let speakers = self.speakers.lock().await;
        let events = self.events.lock().await;

        let lineup = match patch.speaker_ids {
            Some(ids) => Some(checked_lineup(&speakers, ids).await?),
            None => None,
        };
        events
            .update(id, move |event| {
                if let Some(day) = non_empty(patch.day) {
                    event.day = day;
                }
                if let Some(date) = patch.date {
                    event.date = date;
                }
                if let Some(name) = non_empty(patch.event_name) {
                    event.event_name = name;
                }
                if let Some(description) = non_empty(patch.event_description) {
                    event.event_description = Some(description);
                }
                if let Some(ids) = lineup {
                    event.speaker_ids = ids;
                }
                if let Some(active) = patch.is_active {
                    event.is_active = active;
                }
            })
            .await
    }

    pub async fn delete_event(&self, id: u32) -> Result<Compaction<Event>> {
        self.events.delete(id).await
    }
}

/// Dedupe a lineup and check every speaker exists
async fn checked_lineup(speakers: &TableGuard<'_, Speaker>, ids: Vec<u32>) -> Result<Vec<u32>> {
    let mut lineup: Vec<u32> = Vec::with_capacity(ids.len());
    for id in ids {
        if lineup.contains(&id) {
            continue;
        }
        if speakers.store().find_by_id(id).await?.is_none() {
            return Err(Error::InvalidArgument(format!("Unknown speaker {}", id)));
        }
        lineup.push(id);
    }
    Ok(lineup)
}

/// Rewrite event lineups after the speaker table was compacted. Deleted
/// speakers drop out; moved speakers keep their place in the lineup.
pub(crate) async fn follow_speakers(
    events: &TableGuard<'_, Event>,
    speakers: &Renumbering,
) -> Result<usize> {
    if speakers.is_identity() && speakers.removed().is_empty() {
        return Ok(0);
    }
    let affected = |e: &Event| {
        e.speaker_ids
            .iter()
            .any(|id| speakers.resolve(*id) != Some(*id))
    };
    events
        .rewrite_where(&affected, |event| {
            event.speaker_ids = event
                .speaker_ids
                .iter()
                .filter_map(|id| speakers.resolve(*id))
                .collect();
            true
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewSpeaker;
    use chrono::TimeZone;

    fn event(name: &str, speaker_ids: Vec<u32>) -> NewEvent {
        NewEvent {
            day: "Day 1".to_string(),
            date: Utc.with_ymd_and_hms(2025, 2, 14, 10, 0, 0).unwrap(),
            event_name: name.to_string(),
            event_description: None,
            speaker_ids,
            is_active: true,
        }
    }

    async fn with_speakers(names: &[&str]) -> Result<Catalog> {
        let catalog = Catalog::in_memory().await?;
        for name in names {
            catalog
                .create_speaker(NewSpeaker {
                    name: name.to_string(),
                    is_active: true,
                    ..Default::default()
                })
                .await?;
        }
        Ok(catalog)
    }

    #[tokio::test]
    async fn test_active_events_embed_speakers() -> Result<()> {
        let catalog = with_speakers(&["a", "b"]).await?;
        catalog.create_event(event("Opening", vec![2, 1, 2])).await?;

        let views = catalog.active_events().await?;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].event.speaker_ids, vec![2, 1]);
        let names: Vec<&str> = views[0].speakers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_speaker_is_rejected() -> Result<()> {
        let catalog = with_speakers(&["a"]).await?;
        let err = catalog.create_event(event("Panel", vec![1, 9])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(catalog.events.next_id().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_speaker_rewrites_lineups() -> Result<()> {
        let catalog = with_speakers(&["a", "b", "c"]).await?;
        catalog.create_event(event("Opening", vec![1, 3])).await?;
        catalog.create_event(event("Panel", vec![2])).await?;
        catalog.create_event(event("Closing", vec![1])).await?;

        catalog.delete_speaker(2).await?;

        let lineups: Vec<Vec<u32>> = catalog
            .events
            .list(Order::Ascending, None)
            .await?
            .into_iter()
            .map(|e| e.speaker_ids)
            .collect();
        assert_eq!(lineups, vec![vec![1, 2], vec![], vec![1]]);
        assert_eq!(catalog.speaker(2).await?.name, "c");
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_replaces_lineup() -> Result<()> {
        let catalog = with_speakers(&["a", "b"]).await?;
        catalog.create_event(event("Opening", vec![1])).await?;
        let updated = catalog
            .update_event(
                1,
                EventPatch {
                    speaker_ids: Some(vec![2]),
                    event_name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(updated.speaker_ids, vec![2]);
        assert_eq!(updated.event_name, "Opening");
        Ok(())
    }
}
