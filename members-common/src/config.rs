//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MEMBERS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "members.db";

/// Days after which a non-complete event message becomes cleanable
pub const DEFAULT_CLEAN_THRESHOLD_DAYS: u32 = 30;

/// Number of event message ids deleted per statement
pub const DEFAULT_SWEEP_CHUNK_SIZE: usize = 1000;

/// Number of background workers executing ingestion jobs
pub const DEFAULT_INGEST_WORKERS: usize = 4;

/// Settings read from `config.toml`
///
/// Every key is optional; a missing file yields [`TomlConfig::default`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding `members.db`
    pub root_folder: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Address the HTTP service binds to
    pub bind_address: String,
    pub port: u16,
    /// Worker tasks draining the ingestion queue
    pub ingest_workers: usize,
    /// Retention threshold in days for the sweeper
    pub event_message_clean_threshold: Option<u32>,
    /// Chunk size for the sweeper
    pub sweep_chunk_size: Option<usize>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            ingest_workers: DEFAULT_INGEST_WORKERS,
            event_message_clean_threshold: None,
            sweep_chunk_size: None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load configuration from an explicit path or the platform default location
    ///
    /// An explicit path that does not exist is an error. A missing default
    /// config file yields the compiled defaults. Nothing is logged here since
    /// the log level is only known once the config is loaded; callers report
    /// the returned [`ConfigSource`] after installing their subscriber.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_file() {
                Some(path) => path,
                None => return Ok((Self::default(), ConfigSource::Defaults)),
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, ConfigSource::File(path)))
    }

    /// Retention threshold, preferring a per-invocation override
    pub fn clean_threshold_days(&self, cli_override: Option<u32>) -> u32 {
        cli_override
            .or(self.event_message_clean_threshold)
            .unwrap_or(DEFAULT_CLEAN_THRESHOLD_DAYS)
    }

    /// Sweeper chunk size, preferring a per-invocation override
    pub fn sweep_chunk_size(&self, cli_override: Option<usize>) -> usize {
        cli_override
            .or(self.sweep_chunk_size)
            .unwrap_or(DEFAULT_SWEEP_CHUNK_SIZE)
    }
}

/// Where a [`TomlConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file was found
    Defaults,
}

impl ConfigSource {
    /// Report the source through the installed subscriber
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config file: {}", path.display()),
            ConfigSource::Defaults => warn!("No config file found, using defaults"),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `MEMBERS_ROOT_FOLDER`
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Path of the database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// First existing config file among the platform locations
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("members").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/members/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/members (or /var/lib/members for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("members"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/members"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("members"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/members"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("members"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\members"))
    } else {
        PathBuf::from("./members_data")
    }
}
