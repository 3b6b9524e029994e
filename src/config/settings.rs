//! Application settings loaded from `config.toml`.
//!
//! Every section has defaults, so a missing file or a partial file is fine. Secrets
//! (`AUTH_JWT_SECRET`, `STORAGE_SIGNING_KEY`) and `DATABASE_URL` are never read from the
//! file; they come from the environment at the point of use.

use crate::entities::Role;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Longest lifetime a signed document link may be issued with (one week).
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Root configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// Object storage
    pub storage: StorageConfig,
    /// Chat behaviour
    pub chat: ChatConfig,
    /// Admin profiles seeded at start-up
    pub admins: Vec<AdminSeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Object storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded files are written to
    pub root: PathBuf,
    /// Base URL the `/files` route is reachable under
    pub public_base_url: String,
    /// Lifetime of signed URLs for private documents
    pub signed_url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/uploads"),
            public_base_url: "http://127.0.0.1:8080/files".to_string(),
            signed_url_ttl_secs: 600,
        }
    }
}

/// Chat settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// How often clients should poll the unread counter
    pub unread_poll_interval_secs: u64,
    /// Longest accepted message, in characters
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            unread_poll_interval_secs: 30,
            max_message_length: 2000,
        }
    }
}

/// An admin profile to create on start-up
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    /// User id from the auth provider
    pub user_id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub display_name: String,
}

impl AdminSeed {
    /// Role assigned to seeded profiles.
    #[must_use]
    pub const fn role(&self) -> Role {
        Role::Admin
    }
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;
    validate(&config)?;
    Ok(config)
}

/// Loads configuration from a TOML file.
///
/// A missing file yields the defaults; an unreadable or malformed file is an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);

    if !path_ref.exists() {
        info!("No configuration file at {:?}, using defaults", path_ref);
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `CONFIG_PATH` or `./config.toml`.
pub fn load_app_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        admins = config.admins.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.chat.max_message_length == 0 {
        return Err(Error::Config {
            message: "chat.max_message_length must be greater than zero".to_string(),
        });
    }
    if config.chat.unread_poll_interval_secs == 0 {
        return Err(Error::Config {
            message: "chat.unread_poll_interval_secs must be greater than zero".to_string(),
        });
    }
    if config.storage.signed_url_ttl_secs == 0
        || config.storage.signed_url_ttl_secs > MAX_SIGNED_URL_TTL_SECS
    {
        return Err(Error::Config {
            message: format!(
                "storage.signed_url_ttl_secs must be between 1 and {MAX_SIGNED_URL_TTL_SECS}"
            ),
        });
    }
    if config.admins.iter().any(|a| a.user_id.trim().is_empty()) {
        return Err(Error::Config {
            message: "admins[].user_id cannot be empty".to_string(),
        });
    }
    Ok(())
}
