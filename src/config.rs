//! Application configuration
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. An optional TOML file (`--config bookfair.toml`)
//! 3. Environment variables prefixed `BOOKFAIR_`, with `__` between
//!    nested keys (`BOOKFAIR_SERVER__PORT=9000`)
//!
//! Command-line flags are applied on top by the binary.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one JSON snapshot per table
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    pub mail: MailSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            media: MediaSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    /// Disables authentication on write routes
    pub dev_mode: bool,
    pub enable_cors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            dev_mode: false,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            token_ttl_hours: 12,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Upload speaker images and publisher logos to Cloudinary instead of
    /// storing the bytes
    pub cloudinary: Option<CloudinarySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub upload_preset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// JSON mail API endpoint. Without one, messages are only logged.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            from: "noreply@bookfair.local".to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional file, then `BOOKFAIR_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default()).map_err(config_error)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("BOOKFAIR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::SerializationError(e.to_string()))
    }
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}
