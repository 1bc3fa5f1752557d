//! Layered server configuration.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. `meetings.toml` (or the file named by `MEETINGS_CONFIG`)
//! 3. Environment variables prefixed `MEETINGS_`, nested keys split on `__`
//! 4. A bare `DATABASE_URL`
//!
//! Example: `MEETINGS_SERVER__PORT=9000` sets `server.port`.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::security::file_validation::DEFAULT_MAX_FILE_SIZE;

pub const ENV_PREFIX: &str = "MEETINGS_";
pub const DEFAULT_CONFIG_FILE: &str = "meetings.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub roles: RolesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Without a `url` the server keeps everything in memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub attachments_dir: PathBuf,
    pub max_attachments_per_request: usize,
    pub max_file_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachments_dir: PathBuf::from("./data/attachments"),
            max_attachments_per_request: 5,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// When set, tokens must carry a matching `iss` claim.
    pub issuer: Option<String>,
}

/// Role names granted each workflow capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub approve: Vec<String>,
    pub confirm: Vec<String>,
    pub announce: Vec<String>,
    pub cancel: Vec<String>,
    /// Identities granted every capability regardless of role.
    pub compat_identities: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        let roles = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            approve: roles(&["EdOffice", "secadmin"]),
            confirm: roles(&["ManagementOffice", "secadmin"]),
            announce: roles(&["ManagementOffice", "secadmin"]),
            cancel: roles(&["EdOffice", "ManagementOffice", "secadmin"]),
            compat_identities: Vec::new(),
        }
    }
}

pub fn figment(path: &Path) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("Config file {} missing; using defaults and env only", path.display());
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let path = std::env::var(format!("{ENV_PREFIX}CONFIG"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: AppConfig = figment(path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database.url = Some(url);
            }
        }

        if config.auth.jwt_secret.is_empty() {
            warn!("No auth.jwt_secret configured; generating an ephemeral secret");
            config.auth.jwt_secret = uuid::Uuid::new_v4().to_string();
        }

        info!(
            "Configuration loaded: bind {}, database {}, attachments in {}",
            config.server.bind_address(),
            if config.database.url.is_some() { "postgres" } else { "in-memory" },
            config.storage.attachments_dir.display()
        );
        Ok(config)
    }
}
