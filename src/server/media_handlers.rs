//! Gallery and partner image handlers

use axum::{
    extract::{Extension, Json, Multipart, Path},
    response::IntoResponse,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use super::handlers::{created, message};
use super::security::Editor;
use super::upload::{Form, UploadRules};
use super::AppState;
use crate::error::{Error, Result};
use crate::media::ImageProfile;
use crate::model::ImageView;

/// Compressed bytes of every `images` part, in upload order
async fn uploaded_images(state: &AppState, multipart: Multipart) -> Result<Vec<Vec<u8>>> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_5MB).await?;
    let raw: Vec<Vec<u8>> = form.files("images").into_iter().map(|f| f.bytes).collect();
    if raw.is_empty() {
        return Err(Error::InvalidArgument("No images uploaded".to_string()));
    }
    state.media.compress_all(raw, ImageProfile::STANDARD).await
}

#[instrument(skip_all)]
pub async fn upload_gallery(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let images = uploaded_images(&state, multipart).await?;
    let stored = state.catalog.add_gallery_images(images).await?;
    info!(count = stored.len(), "Gallery images uploaded");
    let views: Vec<ImageView> = stored.iter().map(|i| i.view()).collect();
    Ok(created(json!({
        "message": "Images uploaded successfully",
        "images": views,
    })))
}

pub async fn list_gallery(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ImageView>>> {
    let images = state.catalog.gallery_images().await?;
    Ok(Json(images.iter().map(|i| i.view()).collect()))
}

#[instrument(skip(state, _editor, multipart))]
pub async fn replace_gallery_image(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_5MB).await?;
    let file = form
        .file("image")
        .ok_or_else(|| Error::InvalidArgument("No image uploaded".to_string()))?;
    let bytes = state.media.compress(file.bytes, ImageProfile::STANDARD).await?;
    let image = state.catalog.replace_gallery_image(id, bytes).await?;
    Ok(Json(json!({
        "message": "Image updated successfully",
        "image": image.view(),
    })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_gallery_image(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_gallery_image(id).await?;
    Ok(message("Image deleted and IDs reset successfully"))
}

#[instrument(skip_all)]
pub async fn upload_partners(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let images = uploaded_images(&state, multipart).await?;
    let stored = state.catalog.add_partner_images(images).await?;
    info!(count = stored.len(), "Partner images uploaded");
    let views: Vec<ImageView> = stored.iter().map(|i| i.view()).collect();
    Ok(created(json!({
        "message": "Images uploaded successfully",
        "images": views,
    })))
}

pub async fn list_partners(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ImageView>>> {
    let images = state.catalog.partner_images().await?;
    Ok(Json(images.iter().map(|i| i.view()).collect()))
}

#[instrument(skip(state, _editor))]
pub async fn delete_partner_image(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_partner_image(id).await?;
    Ok(message("Image deleted and IDs reset successfully"))
}
