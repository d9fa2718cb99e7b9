//! Application settings.
//!
//! Settings come from an optional `config.toml` (path overridable through
//! `CLUB_CONFIG`) and are then overridden by environment variables loaded via
//! `.env`. Every section has defaults, so a missing file still yields a runnable
//! configuration.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Relational store settings
    pub database: DatabaseSettings,
    /// Feedback document store settings
    pub documents: DocumentSettings,
    /// Session lifetime settings
    pub session: SessionSettings,
    /// Bootstrap admin account
    pub admin: AdminSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `0.0.0.0:3000`
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Relational store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL understood by `SeaORM`
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a request waits for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/clubms.sqlite?mode=rwc".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

/// Feedback document store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// URL of the database holding feedback documents
    pub url: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/club_feedback.sqlite?mode=rwc".to_string(),
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Hours until a session cookie expires
    pub ttl_hours: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

/// Bootstrap admin account, created at startup when missing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    /// Only read from the environment (`ADMIN_PASSWORD`) in practice
    pub password: Option<String>,
    pub full_name: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
            full_name: "Administrator".to_string(),
        }
    }
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Applies environment overrides on top of a parsed configuration.
///
/// `lookup` abstracts `std::env::var` so tests can supply their own values.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(url) = lookup("FEEDBACK_DATABASE_URL") {
        config.documents.url = url;
    }
    if let Some(bind) = lookup("CLUB_BIND_ADDRESS") {
        config.server.bind_address = bind;
    }
    if let Some(password) = lookup("ADMIN_PASSWORD") {
        config.admin.password = Some(password);
    }
    config
}

/// Loads the full application configuration.
///
/// A missing config file is not an error; the defaults are used instead.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CLUB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        info!("Loading configuration from {}", path);
        load_config(&path)?
    } else {
        warn!("No configuration file at {}, using defaults", path);
        AppConfig::default()
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());

    if config.session.ttl_hours <= 0 {
        return Err(Error::Config {
            message: "session.ttl_hours must be positive".to_string(),
        });
    }

    Ok(config)
}
