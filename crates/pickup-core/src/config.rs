//! Configuration loading
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `<config dir>/pickup/config.toml`
//! 3. Project config: `.pickup/config.toml`
//! 4. A config file named on the command line, if any
//! 5. Environment variables: `PICKUP_*`
//! 6. CLI flags (applied by the binary)
//!
//! # Example Config
//!
//! ```toml
//! backend = "sqlite"
//! database = "/var/lib/pickup/pickup.db"
//! lanes = ["lane-1", "lane-2", "lane-3", "lane-4"]
//! log_level = "debug"
//! ```

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{ids::LaneId, Error, Result};

/// Lanes offered when nothing is configured.
const DEFAULT_LANES: [&str; 3] = ["lane-1", "lane-2", "lane-3"];

/// Largest config file we are willing to read.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576; // 1 MB

const VALID_KEYS: &[&str] = &["backend", "database", "lanes", "log_level"];

/// Where documents are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable `SQLite` file
    #[default]
    Sqlite,
    /// Process memory, gone on exit
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::InvalidConfig(format!(
                "unknown backend '{other}' (expected sqlite or memory)"
            ))),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub backend: StoreBackend,
    pub database: PathBuf,
    pub lanes: Vec<LaneId>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database: default_database_path(),
            lanes: DEFAULT_LANES
                .iter()
                .filter_map(|lane| LaneId::parse(*lane).ok())
                .collect(),
            log_level: "info".to_string(),
        }
    }
}

/// Partial configuration with `Option<T>` fields for explicit-key merge semantics.
///
/// Only keys present in a file are `Some` and override lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialConfig {
    #[serde(default)]
    pub backend: Option<StoreBackend>,
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub lanes: Option<Vec<LaneId>>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Merge a partial layer. Absent keys keep their current value.
    pub fn merge_partial(&mut self, partial: PartialConfig) {
        if let Some(backend) = partial.backend {
            self.backend = backend;
        }
        if let Some(database) = partial.database {
            self.database = database;
        }
        if let Some(lanes) = partial.lanes {
            self.lanes = lanes;
        }
        if let Some(log_level) = partial.log_level {
            self.log_level = log_level;
        }
    }

    /// Apply `PICKUP_*` environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a variable holds an invalid value
    pub fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("PICKUP_BACKEND") {
            self.backend = value
                .parse()
                .map_err(|e| Error::InvalidConfig(format!("Invalid PICKUP_BACKEND value: {e}")))?;
        }

        if let Ok(value) = std::env::var("PICKUP_DATABASE") {
            self.database = PathBuf::from(value);
        }

        // comma-separated
        if let Ok(value) = std::env::var("PICKUP_LANES") {
            self.lanes = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(LaneId::parse)
                .collect::<Result<_>>()
                .map_err(|e| Error::InvalidConfig(format!("Invalid PICKUP_LANES value: {e}")))?;
        }

        if let Ok(value) = std::env::var("PICKUP_LOG") {
            self.log_level = value;
        }

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for duplicate lanes, a blank log level, or a
    /// `SQLite` backend without a database path
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.lanes.iter().find(|lane| !seen.insert(*lane)) {
            return Err(Error::InvalidConfig(format!("lane '{dup}' is listed twice")));
        }

        if self.log_level.trim().is_empty() {
            return Err(Error::InvalidConfig("log_level cannot be empty".to_string()));
        }

        if self.backend == StoreBackend::Sqlite && self.database.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "database path is required for the sqlite backend".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load configuration from all layers.
///
/// `explicit` is a config file named on the command line; unlike the global
/// and project files it must exist.
///
/// # Errors
///
/// Returns error if:
/// - A config file is malformed TOML or has unknown keys
/// - An explicit config file cannot be read
/// - Config values fail validation
pub async fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    let optional = [global_config_path().ok(), project_config_path().ok()];
    for path in optional.iter().flatten() {
        match load_partial_toml_file(path).await {
            Ok(layer) => {
                tracing::debug!(path = %path.display(), "loaded config layer");
                config.merge_partial(layer);
            }
            // missing file
            Err(Error::IoError(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if let Some(path) = explicit {
        config.merge_partial(load_partial_toml_file(path).await?);
    }

    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// Load a TOML file into a [`PartialConfig`].
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read (`IoError`)
/// - File is a symlink or larger than 1 MB (`InvalidConfig`)
/// - TOML is malformed or has unknown keys (`ParseError` / `InvalidConfig`)
pub async fn load_partial_toml_file(path: &Path) -> Result<PartialConfig> {
    let metadata = tokio::fs::symlink_metadata(path).await.map_err(|e| {
        Error::IoError(format!(
            "Failed to read config file metadata {}: {e}",
            path.display()
        ))
    })?;

    if metadata.file_type().is_symlink() {
        return Err(Error::InvalidConfig(format!(
            "Config file {} is a symbolic link - refusing to follow",
            path.display()
        )));
    }

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(Error::InvalidConfig(format!(
            "Config file {} exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::IoError(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    parse_partial(&content)
        .map_err(|e| match e {
            Error::ParseError(msg) => Error::ParseError(format!("{}: {msg}", path.display())),
            other => other,
        })
}

/// Parse TOML text into a [`PartialConfig`], rejecting unknown keys.
///
/// # Errors
///
/// Returns `ParseError` for malformed TOML or values and `InvalidConfig` for
/// unknown keys
pub fn parse_partial(content: &str) -> Result<PartialConfig> {
    let value: toml::Table = toml::from_str(content)
        .map_err(|e| Error::ParseError(format!("Failed to parse config: {e}")))?;

    for key in value.keys() {
        validate_key(key)?;
    }

    toml::from_str(content).map_err(|e| Error::ParseError(format!("Failed to parse config: {e}")))
}

/// Check a configuration key against the known keys.
///
/// # Errors
///
/// Returns `InvalidConfig` naming the key and the valid alternatives
pub fn validate_key(key: &str) -> Result<()> {
    if VALID_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "Unknown configuration key: '{key}'. Valid keys: {}",
            VALID_KEYS.join(", ")
        )))
    }
}

fn project_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(".pickup/config.toml"))
        .map_err(|e| Error::IoError(format!("Failed to get current directory: {e}")))
}

fn global_config_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "pickup")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or_else(|| Error::IoError("Failed to determine global config directory".to_string()))
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "pickup").map_or_else(
        || PathBuf::from("pickup.db"),
        |dirs| dirs.data_dir().join("pickup.db"),
    )
}
