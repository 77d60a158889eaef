use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::storage::{app_dir, ensure_private_dir};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub google: GoogleConfig,
    pub agenda: AgendaConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_cache: PathBuf,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgendaConfig {
    pub refresh_interval_minutes: u32,
    pub clock_time_format: String,
    pub clock_date_format: String,
    pub event_time_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    pub preferences: PathBuf,
}

impl GoogleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            Ok(config)
        }
    }

    pub fn config_path() -> PathBuf {
        app_dir().join("config.toml")
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            ensure_private_dir(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: 15,
            clock_time_format: "%-I:%M %p".to_string(),
            clock_date_format: "%A, %B %-d, %Y".to_string(),
            event_time_format: "%-I:%M".to_string(),
            max_rows: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let dir = app_dir();

        Self {
            google: GoogleConfig {
                client_id: String::new(),
                client_secret: String::new(),
                token_cache: dir.join("token.json"),
                api_base_url: DEFAULT_API_BASE_URL.to_string(),
                request_timeout_secs: 10,
            },
            agenda: AgendaConfig::default(),
            paths: PathsConfig {
                preferences: dir.join("preferences.json"),
            },
        }
    }
}
