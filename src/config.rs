//! Configuration management for taskboard.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `DEV_MODE` - Optional. When true, every request runs as the placeholder
//!   account (1, 1) with all permissions. Defaults to `false`.
//! - `JWT_SECRET` - Required unless `DEV_MODE` is set. HS256 secret used to
//!   verify bearer tokens.
//! - `TASK_STORE` - Optional. `memory` or `sqlite`. Defaults to `memory`.
//! - `DATA_DIR` - Optional. Directory for the SQLite database. Defaults to `./data`.

use std::path::PathBuf;
use thiserror::Error;

use crate::task_store::TaskStoreType;
use crate::util::env_var_bool;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// How callers are identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication: every request gets the placeholder credential.
    Disabled,
    /// Bearer JWTs signed with a shared secret.
    Jwt { secret: String },
}

impl AuthConfig {
    pub fn mode_name(&self) -> &'static str {
        match self {
            AuthConfig::Disabled => "disabled",
            AuthConfig::Jwt { .. } => "jwt",
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Authentication settings
    pub auth: AuthConfig,

    /// Which task store backend to use
    pub store: TaskStoreType,

    /// Directory holding persistent data (SQLite store)
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set outside
    /// dev mode, and `ConfigError::InvalidValue` for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let dev_mode = env_var_bool("DEV_MODE", false);
        let auth = if dev_mode {
            AuthConfig::Disabled
        } else {
            let secret = std::env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;
            AuthConfig::Jwt { secret }
        };

        let store = match std::env::var("TASK_STORE") {
            Ok(value) => TaskStoreType::parse(&value).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TASK_STORE".to_string(),
                    format!("unknown store '{}' (expected memory or sqlite)", value),
                )
            })?,
            Err(_) => TaskStoreType::default(),
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        Ok(Self {
            host,
            port,
            auth,
            store,
            data_dir,
        })
    }

    /// Create a dev-mode config with an in-memory store (useful for testing).
    pub fn dev() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            auth: AuthConfig::Disabled,
            store: TaskStoreType::Memory,
            data_dir: PathBuf::from("data"),
        }
    }
}
