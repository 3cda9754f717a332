//! Account handlers and shared response helpers

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::Role;
use crate::server::security::SuperAdmin;
use crate::server::AppState;

/// `201 Created` with a JSON body
pub(crate) fn created<T: serde::Serialize>(body: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(body))
}

/// `{"message": ...}`
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .catalog
        .register(payload.name, payload.email, payload.password)
        .await?;
    Ok(created(json!({ "success": true, "user": user.view() })))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let user = state
        .catalog
        .authenticate(&payload.email, payload.password)
        .await?;
    let token = state.security.issue(&user)?;
    info!(id = user.id, role = %user.role, "User logged in");
    Ok(Json(json!({ "token": token, "user": user.view() })))
}

#[instrument(skip(state, _admin))]
pub async fn set_role(
    _admin: SuperAdmin,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<Value>> {
    let role: Role = payload.role.parse().map_err(|_| {
        crate::error::Error::InvalidArgument(
            "Invalid role. Allowed roles are USER, ADMIN, and SUPER_ADMIN.".to_string(),
        )
    })?;
    let user = state.catalog.set_role(id, role).await?;
    Ok(Json(json!({ "success": true, "updatedUser": user.view() })))
}
