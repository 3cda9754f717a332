//! HTTP routes definition

use axum::{
    extract::Extension,
    http::header,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use std::sync::Arc;

use super::health::HealthStatus;
use super::{content_handlers, handlers, media_handlers, publisher_handlers, AppState};

/// Accounts
///
/// - POST  /users            - Register
/// - POST  /users/login      - Log in (also at /login)
/// - PATCH /users/:id/role   - Change a user's role (super admin)
pub fn user_routes() -> Router {
    Router::new()
        .route("/users", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/login", post(handlers::login))
        .route("/users/:id/role", patch(handlers::set_role))
}

/// Speakers, event schedule, banners, team and about-event entries
pub fn content_routes() -> Router {
    Router::new()
        .route(
            "/speakers",
            get(content_handlers::list_speakers).post(content_handlers::create_speaker),
        )
        .route(
            "/speakers/:id",
            get(content_handlers::get_speaker)
                .put(content_handlers::update_speaker)
                .delete(content_handlers::delete_speaker),
        )
        .route(
            "/events",
            get(content_handlers::list_events).post(content_handlers::create_event),
        )
        .route(
            "/events/:id",
            put(content_handlers::update_event).delete(content_handlers::delete_event),
        )
        .route(
            "/banners",
            get(content_handlers::list_banners).post(content_handlers::create_banner),
        )
        .route(
            "/banners/:id",
            put(content_handlers::update_banner).delete(content_handlers::delete_banner),
        )
        .route(
            "/teams",
            get(content_handlers::list_team).post(content_handlers::create_team_member),
        )
        .route(
            "/teams/:id",
            axum::routing::delete(content_handlers::delete_team_member),
        )
        .route(
            "/aboutEvent",
            get(content_handlers::list_about_events).post(content_handlers::create_about_event),
        )
        .route(
            "/aboutEvent/:id",
            put(content_handlers::update_about_event)
                .delete(content_handlers::delete_about_event),
        )
}

/// Gallery and partner logos
pub fn media_routes() -> Router {
    Router::new()
        .route(
            "/gallery",
            get(media_handlers::list_gallery).post(media_handlers::upload_gallery),
        )
        .route(
            "/gallery/:id",
            put(media_handlers::replace_gallery_image).delete(media_handlers::delete_gallery_image),
        )
        .route(
            "/partners",
            get(media_handlers::list_partners).post(media_handlers::upload_partners),
        )
        .route(
            "/partners/:id",
            axum::routing::delete(media_handlers::delete_partner_image),
        )
}

/// Publishers, their books and cart orders
pub fn publisher_routes() -> Router {
    Router::new()
        .route(
            "/publishers",
            get(publisher_handlers::list_publishers).post(publisher_handlers::create_publisher),
        )
        .route(
            "/publishers/:id",
            get(publisher_handlers::get_publisher)
                .put(publisher_handlers::update_publisher)
                .delete(publisher_handlers::delete_publisher),
        )
        .route("/publishers/:id/books", post(publisher_handlers::add_book))
        .route(
            "/publishers/:id/books/:book_id",
            axum::routing::delete(publisher_handlers::delete_book),
        )
        .route(
            "/cart",
            get(publisher_handlers::list_orders).post(publisher_handlers::create_order),
        )
        .route("/cart/export", get(publisher_handlers::export_orders))
        .route(
            "/cart/:id",
            get(publisher_handlers::get_order)
                .put(publisher_handlers::update_order)
                .delete(publisher_handlers::delete_order),
        )
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/_health", get(health))
        .route("/health", get(health))
        .route("/_metrics", get(metrics_endpoint))
}

async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthStatus> {
    Json(state.health.status(&state.catalog))
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::export_metrics(),
    )
}
