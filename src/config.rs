//! Layered configuration: defaults, then the YAML file, then environment
//! variables (`TALLY_SYNC_*`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tally::TableKind;

/// Where the Tally engine listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TallyConfig {
    pub server: String,
    pub port: u16,
    /// Company to scope exports to; empty or absent means whichever
    /// company the engine currently has open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 9000,
            company: None,
        }
    }
}

/// Scheduling and export layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Minutes between sync cycles.
    pub interval_minutes: u64,
    /// Directory the raw XML exports are written into.
    pub export_path: PathBuf,
    /// Table names to sync each cycle; absent means the full catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            export_path: PathBuf::from("./exports"),
            tables: None,
        }
    }
}

impl SyncConfig {
    /// Resolves the configured table names, or the full catalog when none
    /// are listed.
    pub fn table_kinds(&self) -> Result<Vec<TableKind>, ConfigError> {
        match &self.tables {
            None => Ok(TableKind::ALL.to_vec()),
            Some(names) => names
                .iter()
                .map(|name| {
                    name.parse()
                        .map_err(|_| ConfigError::UnknownTable(name.clone()))
                })
                .collect(),
        }
    }
}

/// Backend API endpoint and the organisation selected at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<u32>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3001".to_string(),
            organisation_id: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tally: TallyConfig,
    pub sync: SyncConfig,
    pub backend: BackendConfig,
    /// Config file path used (if any)
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(Self::default_config_path);

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let mut config: Config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
            config.config_file = Some(path);
            config
        } else {
            Config::default()
        };

        // Apply environment variable overrides
        if let Ok(server) = std::env::var("TALLY_SYNC_SERVER") {
            config.tally.server = server;
        }
        if let Ok(port) = std::env::var("TALLY_SYNC_PORT") {
            match port.parse() {
                Ok(port) => config.tally.port = port,
                Err(_) => warn!("Ignoring unparsable TALLY_SYNC_PORT '{}'", port),
            }
        }
        if let Ok(company) = std::env::var("TALLY_SYNC_COMPANY") {
            config.tally.company = Some(company).filter(|c| !c.is_empty());
        }
        if let Ok(interval) = std::env::var("TALLY_SYNC_INTERVAL") {
            match interval.parse() {
                Ok(minutes) => config.sync.interval_minutes = minutes,
                Err(_) => warn!("Ignoring unparsable TALLY_SYNC_INTERVAL '{}'", interval),
            }
        }
        if let Ok(export_path) = std::env::var("TALLY_SYNC_EXPORT_PATH") {
            config.sync.export_path = PathBuf::from(export_path);
        }
        if let Ok(url) = std::env::var("TALLY_SYNC_BACKEND_URL") {
            config.backend.url = url;
        }

        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        }
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::SerializeError(path.to_path_buf(), e))?;
        std::fs::write(path, yaml).map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Where `save` should write: an explicit `--config` override wins,
    /// then the file the configuration was loaded from, then the default.
    pub fn save_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.config_file.clone())
            .unwrap_or_else(Self::default_config_path)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/tally-sync/
    /// - macOS: ~/Library/Application Support/tally-sync/
    /// - Windows: %APPDATA%/tally-sync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally-sync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/tally-sync/
    /// - macOS: ~/Library/Application Support/tally-sync/
    /// - Windows: %APPDATA%/tally-sync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally-sync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Where the authentication session is persisted.
    pub fn default_auth_state_path() -> PathBuf {
        Self::default_data_dir().join("auth-state.json")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    SerializeError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
    UnknownTable(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::SerializeError(path, e) => {
                write!(
                    f,
                    "Failed to serialize config for '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::UnknownTable(name) => {
                write!(f, "Unknown table '{}' in sync.tables", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
