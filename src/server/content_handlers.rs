//! Speakers, events, banners, team and about-event handlers

use axum::{
    extract::{Extension, Json, Multipart, Path},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use super::handlers::{created, message};
use super::security::Editor;
use super::upload::{Form, UploadRules};
use super::AppState;
use crate::catalog::{
    AboutEventPatch, BannerPatch, EventPatch, NewAboutEvent, NewBanner, NewEvent, NewSpeaker,
    NewTeamMember, SpeakerPatch,
};
use crate::error::{Error, Result};
use crate::media::ImageProfile;
use crate::model::content::{
    AboutEventView, BannerView, EventView, SpeakerView, TeamMemberView,
};
use crate::model::{optional_flag, optional_ids, parse_date};

// Speakers

#[instrument(skip_all)]
pub async fn create_speaker(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_5MB).await?;
    let image = match form.file("image") {
        Some(file) => Some(
            state
                .media
                .store(file.bytes, ImageProfile::STANDARD, "speakers")
                .await?,
        ),
        None => None,
    };
    let speaker = state
        .catalog
        .create_speaker(NewSpeaker {
            name: form.require("name")?,
            designation: form.text("designation"),
            note: form.text("note"),
            is_active: form.flag("isActive").unwrap_or(false),
            image,
        })
        .await?;
    Ok(created(speaker.view()))
}

pub async fn list_speakers(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<SpeakerView>>> {
    let speakers = state.catalog.active_speakers().await?;
    Ok(Json(speakers.iter().map(|s| s.view()).collect()))
}

pub async fn get_speaker(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<SpeakerView>> {
    Ok(Json(state.catalog.speaker(id).await?.view()))
}

#[instrument(skip(state, _editor, multipart))]
pub async fn update_speaker(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_5MB).await?;
    let image = match form.file("image") {
        Some(file) => Some(
            state
                .media
                .store(file.bytes, ImageProfile::STANDARD, "speakers")
                .await?,
        ),
        None => None,
    };
    let speaker = state
        .catalog
        .update_speaker(
            id,
            SpeakerPatch {
                name: form.text("name"),
                designation: form.text("designation"),
                note: form.text("note"),
                is_active: form.flag("isActive"),
                image,
            },
        )
        .await?;
    Ok(Json(json!({ "success": true, "updatedSpeaker": speaker.view() })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_speaker(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_speaker(id).await?;
    Ok(message("Speaker deleted and IDs reset successfully"))
}

// Events

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default, deserialize_with = "optional_ids")]
    pub speaker_ids: Option<Vec<u32>>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_active: Option<bool>,
}

#[instrument(skip_all)]
pub async fn create_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EventRequest>,
) -> Result<impl IntoResponse> {
    let date = payload
        .date
        .as_deref()
        .ok_or_else(|| Error::InvalidArgument("date is required".to_string()))
        .and_then(parse_date)?;
    let event = state
        .catalog
        .create_event(NewEvent {
            day: payload.day.unwrap_or_default(),
            date,
            event_name: payload.event_name.unwrap_or_default(),
            event_description: payload.event_description,
            speaker_ids: payload.speaker_ids.unwrap_or_default(),
            is_active: payload.is_active.unwrap_or(false),
        })
        .await?;
    Ok(created(event))
}

pub async fn list_events(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.catalog.active_events().await?))
}

#[instrument(skip(state, _editor, payload))]
pub async fn update_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(payload): Json<EventRequest>,
) -> Result<impl IntoResponse> {
    let date = match payload.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(d) => Some(parse_date(d)?),
        None => None,
    };
    let event = state
        .catalog
        .update_event(
            id,
            EventPatch {
                day: payload.day,
                date,
                event_name: payload.event_name,
                event_description: payload.event_description,
                speaker_ids: payload.speaker_ids,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(Json(event))
}

#[instrument(skip(state, _editor))]
pub async fn delete_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_event(id).await?;
    Ok(message("Event schedule deleted and IDs reset successfully"))
}

// Banners

#[instrument(skip_all)]
pub async fn create_banner(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_10MB).await?;
    let image = match form.file("image") {
        Some(file) => Some(state.media.compress(file.bytes, ImageProfile::WIDE).await?),
        None => None,
    };
    let banner = state
        .catalog
        .create_banner(NewBanner {
            text: form.text("text"),
            content: form.text("content"),
            image,
            is_active: form.flag("isActive").unwrap_or(false),
        })
        .await?;
    Ok(created(banner.view()))
}

pub async fn list_banners(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<BannerView>>> {
    let banners = state.catalog.active_banners().await?;
    Ok(Json(banners.iter().map(|b| b.view()).collect()))
}

#[instrument(skip(state, _editor, multipart))]
pub async fn update_banner(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_10MB).await?;
    let image = match form.file("image") {
        Some(file) => Some(state.media.compress(file.bytes, ImageProfile::WIDE).await?),
        None => None,
    };
    let banner = state
        .catalog
        .update_banner(
            id,
            BannerPatch {
                text: form.text("text"),
                content: form.text("content"),
                image,
                is_active: form.flag("isActive"),
            },
        )
        .await?;
    Ok(Json(json!({ "success": true, "updatedBanner": banner.view() })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_banner(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_banner(id).await?;
    Ok(message("Banner deleted and IDs reset successfully"))
}

// Team

#[instrument(skip_all)]
pub async fn create_team_member(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_5MB).await?;
    let image = match form.file("image") {
        Some(file) => Some(state.media.compress(file.bytes, ImageProfile::STANDARD).await?),
        None => None,
    };
    let member = state
        .catalog
        .create_team_member(NewTeamMember {
            name: form.require("name")?,
            description: form.text("description"),
            short_name: form.text("shortName"),
            image,
        })
        .await?;
    Ok(created(member.view()))
}

pub async fn list_team(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<TeamMemberView>>> {
    let team = state.catalog.team_members().await?;
    Ok(Json(team.iter().map(|t| t.view()).collect()))
}

#[instrument(skip(state, _editor))]
pub async fn delete_team_member(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_team_member(id).await?;
    Ok(message("Team member deleted successfully"))
}

// About the event

#[instrument(skip_all)]
pub async fn create_about_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::parse(multipart, UploadRules::VIDEO_50MB).await?;
    let date = form
        .date("date")?
        .ok_or_else(|| Error::InvalidArgument("date is required".to_string()))?;
    let entry = state
        .catalog
        .create_about_event(NewAboutEvent {
            title: form.require("title")?,
            description: form.text("description"),
            location: form.text("location"),
            date,
            video: form.file("video").map(|f| f.bytes),
        })
        .await?;
    Ok(created(entry.view()))
}

pub async fn list_about_events(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<AboutEventView>>> {
    let entries = state.catalog.about_events().await?;
    Ok(Json(entries.iter().map(|e| e.view()).collect()))
}

#[instrument(skip(state, _editor, multipart))]
pub async fn update_about_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = Form::parse(multipart, UploadRules::VIDEO_50MB).await?;
    let entry = state
        .catalog
        .update_about_event(
            id,
            AboutEventPatch {
                title: form.text("title"),
                description: form.text("description"),
                location: form.text("location"),
                date: form.date("date")?,
                video: form.file("video").map(|f| f.bytes),
            },
        )
        .await?;
    Ok(Json(json!({ "success": true, "updatedEvent": entry.view() })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_about_event(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_about_event(id).await?;
    Ok(message("Event deleted successfully"))
}
