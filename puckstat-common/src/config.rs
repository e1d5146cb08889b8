//! Bootstrap configuration loading and data folder resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PUCKSTAT_CONFIG";

/// Environment variable naming the data folder (database location)
pub const DATA_FOLDER_ENV_VAR: &str = "PUCKSTAT_DATA_FOLDER";

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "puckstat.db";

/// Bootstrap configuration loaded from `puckstat.toml`
///
/// Every field is optional; a missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (ignored when `database_path` is set)
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Explicit database file path
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Season to scrape (`YYYYYYYY`); defaults to the current season
    #[serde(default)]
    pub season: Option<String>,

    /// Overall pass deadline in seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-source overrides keyed by source id (`[sources.moneypuck]`)
    #[serde(default)]
    pub sources: BTreeMap<String, SourceOverrides>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Optional per-source settings from TOML; unset fields fall back to built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceOverrides {
    pub enabled: Option<bool>,
    pub requests_per_second: Option<f64>,
    pub jitter_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub base_url: Option<String>,
}

/// Locate the config file
///
/// `cli_arg` → `PUCKSTAT_CONFIG` → `~/.config/puckstat/puckstat.toml` → `/etc/puckstat/puckstat.toml`.
/// Returns `None` when no file exists (not an error).
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("puckstat").join("puckstat.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/puckstat/puckstat.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the bootstrap config with graceful degradation
///
/// An explicitly requested file (CLI argument) that cannot be read is an error;
/// a missing or unreadable discovered file logs a warning and yields defaults.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match locate_config_file(cli_arg) {
        Some(path) => match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded config: {}", path.display());
                Ok(config)
            }
            Err(e) if cli_arg.is_some() => Err(e),
            Err(e) => {
                warn!("Ignoring config file ({}), using defaults", e);
                Ok(TomlConfig::default())
            }
        },
        None => {
            info!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the database file path
///
/// CLI `--database` → `database_path` in TOML → data folder (`PUCKSTAT_DATA_FOLDER` →
/// TOML `data_folder` → OS default) joined with `puckstat.db`.
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    resolve_data_folder(config).join(DATABASE_FILE_NAME)
}

/// Resolve the data folder (environment → TOML → OS default)
pub fn resolve_data_folder(config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/puckstat (or /var/lib/puckstat for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("puckstat"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/puckstat"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("puckstat"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/puckstat"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("puckstat"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\puckstat"))
    } else {
        PathBuf::from("./puckstat_data")
    }
}

/// User-Agent sent to every HTTP source
pub fn user_agent() -> String {
    format!(
        "puckstat/{} (hockey stats collector; polite scraping)",
        env!("CARGO_PKG_VERSION")
    )
}
