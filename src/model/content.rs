//! Speakers, event schedule, banners, team and the "about the event" entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_data_url, JPEG_MIME, MP4_MIME};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, with = "super::blob")]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerView {
    pub id: u32,
    pub name: String,
    pub designation: Option<String>,
    pub note: Option<String>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl Speaker {
    pub fn view(&self) -> SpeakerView {
        SpeakerView {
            id: self.id,
            name: self.name.clone(),
            designation: self.designation.clone(),
            note: self.note.clone(),
            image: optional_data_url(JPEG_MIME, &self.image),
            image_url: self.image_url.clone(),
            is_active: self.is_active,
        }
    }

    /// The short form embedded in event listings
    pub fn summary(&self) -> SpeakerSummary {
        SpeakerSummary {
            id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            image: optional_data_url(JPEG_MIME, &self.image),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSummary {
    pub id: u32,
    pub name: String,
    pub image_url: Option<String>,
    pub image: Option<String>,
}

/// A slot in the event schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u32,
    pub day: String,
    pub date: DateTime<Utc>,
    pub event_name: String,
    #[serde(default)]
    pub event_description: Option<String>,
    /// Speaker ids, kept in step with speaker renumbering
    #[serde(default)]
    pub speaker_ids: Vec<u32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub speakers: Vec<SpeakerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: u32,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, with = "super::blob")]
    pub image: Option<Vec<u8>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    pub id: u32,
    pub text: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
}

impl Banner {
    pub fn view(&self) -> BannerView {
        BannerView {
            id: self.id,
            text: self.text.clone(),
            content: self.content.clone(),
            image: optional_data_url(JPEG_MIME, &self.image),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default, with = "super::blob")]
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberView {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub short_name: Option<String>,
    pub image: Option<String>,
}

impl TeamMember {
    pub fn view(&self) -> TeamMemberView {
        TeamMemberView {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            short_name: self.short_name.clone(),
            image: optional_data_url(JPEG_MIME, &self.image),
        }
    }
}

/// The fair's own description, with an optional promo video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutEvent {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, with = "super::blob")]
    pub video: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutEventView {
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    pub video: Option<String>,
}

impl AboutEvent {
    pub fn view(&self) -> AboutEventView {
        AboutEventView {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            date: self.date,
            video: optional_data_url(MP4_MIME, &self.video),
        }
    }
}

super::impl_record!(Speaker, Event, Banner, TeamMember, AboutEvent);
