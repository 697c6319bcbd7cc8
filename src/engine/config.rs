//! ClinAudit Configuration Module
//! Handles loading and validating clinaudit.config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "clinaudit.config.json";
pub const ENDPOINT_ENV: &str = "CLINAUDIT_ENDPOINT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub project: ProjectConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub mode: AppMode,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Shared endpoint URL; the local database is used when unset or empty.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub sync_mode: SyncMode,
}

/// How mutations reach the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Overwrite the whole collection after every change.
    #[default]
    ReplaceAll,
    /// Send only the touched record; needs an endpoint that serves `upsert`/`delete`.
    Keyed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    #[default]
    Manage,
    /// Read-only: all mutations are rejected.
    View,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    54330
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/clinaudit.db")
}

fn default_storage_key() -> String {
    "audits_all_v2".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            database: default_database_path(),
            storage_key: default_storage_key(),
            sync_mode: SyncMode::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl StoreConfig {
    /// The effective endpoint: the environment override first, then the file.
    /// Blank values count as unset.
    pub fn resolved_endpoint(&self) -> Option<String> {
        std::env::var(ENDPOINT_ENV)
            .ok()
            .or_else(|| self.endpoint.clone())
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

impl Config {
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, project_dir: &Path) -> Result<(), ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn default_for_project(name: &str) -> Self {
        Self {
            version: "0.1.0".to_string(),
            project: ProjectConfig {
                name: name.to_string(),
                id: format!("clinaudit-{}", name),
            },
            store: StoreConfig::default(),
            mode: AppMode::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Absolute path of the local database for a project rooted at `project_dir`.
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store.database)
    }
}
