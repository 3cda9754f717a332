//! Publisher, book and cart handlers

use axum::{
    extract::{Extension, Json, Multipart, Path},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use super::handlers::{created, message};
use super::security::Editor;
use super::upload::{Form, UploadRules};
use super::AppState;
use crate::catalog::{CartOrderPatch, CartOrderView, NewCartOrder, NewPublisher, PublisherPatch};
use crate::error::{Error, Result};
use crate::export;
use crate::media::{ImageProfile, StoredMedia};
use crate::model::publisher::PublisherView;
use crate::model::{string_or_number, Book};
use crate::notify;

/// The `books` form field: a JSON array of titles or `{title}`/`{name}`
/// objects
fn book_titles(raw: Option<String>) -> Result<Vec<String>> {
    let raw = match raw.filter(|r| !r.trim().is_empty()) {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };
    let items: Vec<Value> = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidArgument(format!("books must be a JSON array: {}", e)))?;
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            Value::Object(map) => map
                .get("title")
                .or_else(|| map.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidArgument("book entry has no title".to_string())),
            other => Err(Error::InvalidArgument(format!("invalid book entry: {}", other))),
        })
        .collect()
}

async fn logo(state: &AppState, form: &mut Form) -> Result<Option<StoredMedia>> {
    match form.file("logo") {
        Some(file) => Ok(Some(
            state
                .media
                .store(file.bytes, ImageProfile::WIDE, "publishers")
                .await?,
        )),
        None => Ok(None),
    }
}

// Publishers

#[instrument(skip_all)]
pub async fn create_publisher(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_10MB).await?;
    let books = book_titles(form.text("books"))?;
    let logo = logo(&state, &mut form).await?;
    let (publisher, books) = state
        .catalog
        .create_publisher(NewPublisher {
            publisher_name: form.require("publisherName")?,
            publisher_email: form.require("publisherEmail")?,
            booth_number: form.text("boothNumber").unwrap_or_default(),
            logo,
            books,
        })
        .await?;
    Ok(created(publisher.view(Some(books))))
}

pub async fn list_publishers(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<PublisherView>>> {
    let publishers = state.catalog.publishers_with_books().await?;
    Ok(Json(
        publishers
            .into_iter()
            .map(|(p, books)| p.view(Some(books)))
            .collect(),
    ))
}

pub async fn get_publisher(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<PublisherView>> {
    let (publisher, books) = state.catalog.publisher(id).await?;
    Ok(Json(publisher.view(Some(books))))
}

#[instrument(skip(state, _editor, multipart))]
pub async fn update_publisher(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let mut form = Form::parse(multipart, UploadRules::IMAGE_10MB).await?;
    let logo = logo(&state, &mut form).await?;
    state
        .catalog
        .update_publisher(
            id,
            PublisherPatch {
                publisher_name: form.text("publisherName"),
                publisher_email: form.text("publisherEmail"),
                booth_number: form.text("boothNumber"),
                logo,
            },
        )
        .await?;
    let (publisher, books) = state.catalog.publisher(id).await?;
    Ok(Json(json!({
        "success": true,
        "updatedPublisher": publisher.view(Some(books)),
    })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_publisher(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_publisher(id).await?;
    Ok(message("Publisher deleted and IDs reset successfully"))
}

// Books

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    #[serde(alias = "title")]
    pub name: String,
}

#[instrument(skip(state, _editor, payload))]
pub async fn add_book(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(publisher_id): Path<u32>,
    Json(payload): Json<BookRequest>,
) -> Result<impl IntoResponse> {
    let book: Book = state.catalog.add_book(publisher_id, payload.name).await?;
    Ok(created(book))
}

#[instrument(skip(state, _editor))]
pub async fn delete_book(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path((publisher_id, book_id)): Path<(u32, u32)>,
) -> Result<Json<Value>> {
    state.catalog.delete_book(publisher_id, book_id).await?;
    Ok(message("Book deleted and IDs reset successfully"))
}

// Cart

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub books: Value,
    #[serde(default, deserialize_with = "string_or_number")]
    pub booth_number: String,
    #[serde(deserialize_with = "string_or_number")]
    pub publisher_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPatchRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub books: Option<Value>,
    #[serde(default, deserialize_with = "optional_booth")]
    pub booth_number: Option<String>,
}

fn optional_booth<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    string_or_number(d).map(Some)
}

/// Public: visitors place orders without an account
#[instrument(skip_all, fields(publisher_id = %payload.publisher_id))]
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CartRequest>,
) -> Result<impl IntoResponse> {
    let publisher_id: u32 = payload.publisher_id.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!("invalid publisherId '{}'", payload.publisher_id))
    })?;
    let (order, publisher) = state
        .catalog
        .create_order(NewCartOrder {
            user_name: payload.user_name,
            user_email: payload.user_email,
            books: payload.books,
            booth_number: payload.booth_number,
            publisher_id,
        })
        .await?;
    info!(order = order.id, publisher = publisher.id, "Cart order placed");
    notify::dispatch(
        state.notifier.clone(),
        notify::order_emails(&order, &publisher).to_vec(),
    );
    Ok(created(CartOrderView::new(order, Some(&publisher))))
}

pub async fn list_orders(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<CartOrderView>>> {
    let orders = state.catalog.orders_with_publishers().await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|(order, publisher)| CartOrderView::new(order, publisher.as_ref()))
            .collect(),
    ))
}

#[instrument(skip_all)]
pub async fn export_orders(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let orders = state.catalog.orders_with_publishers().await?;
    let body = export::orders_to_string(&orders)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"orders.csv\""),
        ],
        body,
    ))
}

pub async fn get_order(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<CartOrderView>> {
    let (order, publisher) = state.catalog.order(id).await?;
    Ok(Json(CartOrderView::new(order, publisher.as_ref())))
}

#[instrument(skip(state, _editor, payload))]
pub async fn update_order(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(payload): Json<CartPatchRequest>,
) -> Result<Json<Value>> {
    let order = state
        .catalog
        .update_order(
            id,
            CartOrderPatch {
                user_name: payload.user_name,
                user_email: payload.user_email,
                books: payload.books,
                booth_number: payload.booth_number,
            },
        )
        .await?;
    Ok(Json(json!({ "success": true, "updatedOrder": order })))
}

#[instrument(skip(state, _editor))]
pub async fn delete_order(
    _editor: Editor,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Value>> {
    state.catalog.delete_order(id).await?;
    Ok(message("Order deleted successfully"))
}
