//! HTTP server
//!
//! REST API for the book fair site built on axum. Shared state travels as
//! an `Extension<Arc<AppState>>`.

pub mod content_handlers;
pub mod error;
pub mod handlers;
pub mod health;
pub mod media_handlers;
pub mod middleware;
pub mod publisher_handlers;
pub mod routes;
pub mod security;
pub mod upload;

use axum::{extract::DefaultBodyLimit, extract::Extension, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::media::{CloudinaryHost, ImageHost, JpegCompressor, MediaPipeline};
use crate::notify::{self, Notifier};

pub use health::HealthChecker;
pub use security::{SecurityConfig, SecurityState};

/// Request bodies above this are refused before any handler runs. Per-file
/// limits are checked in [`upload`].
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: String,
    /// HTTP port
    pub http_port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0".to_string(),
            http_port: 5000,
            enable_cors: true,
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            http_addr: config.server.bind.clone(),
            http_port: config.server.port,
            enable_cors: config.server.enable_cors,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub media: MediaPipeline,
    pub notifier: Arc<dyn Notifier>,
    pub security: SecurityState,
    pub health: HealthChecker,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("catalog", &self.catalog)
            .field("media", &self.media)
            .field("security", &self.security)
            .finish()
    }
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        media: MediaPipeline,
        notifier: Arc<dyn Notifier>,
        security: SecurityState,
    ) -> Self {
        Self {
            catalog,
            media,
            notifier,
            security,
            health: HealthChecker::new(),
        }
    }

    /// Wire media, mail and auth from configuration
    pub fn from_config(catalog: Arc<Catalog>, config: &AppConfig) -> Self {
        let host = config.media.cloudinary.as_ref().map(|settings| {
            info!(cloud = %settings.cloud_name, "Hosting images on Cloudinary");
            Arc::new(CloudinaryHost::new(settings)) as Arc<dyn ImageHost>
        });
        let security = SecurityState::new(&SecurityConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            token_ttl_hours: config.auth.token_ttl_hours,
            dev_mode: config.server.dev_mode,
        });
        Self::new(
            catalog,
            MediaPipeline::new(Arc::new(JpegCompressor), host),
            notify::from_settings(&config.mail),
            security,
        )
    }
}

/// All routes with state and middleware attached
pub fn build_router(state: Arc<AppState>, enable_cors: bool) -> Router {
    let app = Router::new()
        .merge(routes::user_routes())
        .merge(routes::content_routes())
        .merge(routes::media_routes())
        .merge(routes::publisher_routes())
        .merge(routes::health_routes())
        .layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    info!(
        addr = %config.http_addr,
        port = config.http_port,
        "Starting book fair HTTP server"
    );

    if state.security.dev_mode() {
        warn!("Authentication disabled (dev mode)");
    }

    crate::metrics::init_metrics();
    let flagged = state.catalog.tables_needing_repair();
    if !flagged.is_empty() {
        warn!(tables = ?flagged, "Tables need repair");
    }

    let app = build_router(Arc::new(state), config.enable_cors);

    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Metrics: http://{}/_metrics", addr);
    info!("Health: http://{}/_health", addr);

    axum::serve(listener, app).await.map_err(|e| {
        error!(error = %e, "Server error");
        anyhow::anyhow!("Server failed: {}", e)
    })
}
