//! Configuration loading and resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The result is an immutable [`ServiceConfig`] built once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_DATABASE: &str = "WFS_DATABASE";
pub const ENV_BIND: &str = "WFS_BIND";
pub const ENV_API_KEY: &str = "WFS_API_KEY";
pub const ENV_ENVIRONMENT: &str = "WFS_ENVIRONMENT";
pub const ENV_AUTO_PROCESS: &str = "WFS_AUTO_PROCESS";
pub const ENV_LOG_LEVEL: &str = "WFS_LOG_LEVEL";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// Shared secret for write operations; `None` runs in open/dev mode
    pub api_key: Option<String>,
    pub environment: String,
    /// Enqueue newly created records for background processing
    pub auto_process: bool,
    pub log_level: String,
}

impl ServiceConfig {
    /// Configuration for a given database with every other setting at its default
    pub fn with_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_key: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            auto_process: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// On-disk TOML configuration; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub database: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub api_key: Option<String>,
    pub environment: Option<String>,
    pub auto_process: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub api_key: Option<String>,
    pub environment: Option<String>,
    pub auto_process: Option<bool>,
    pub log_level: Option<String>,
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Write a TOML config file
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the full service configuration from CLI, environment, TOML and defaults
pub fn resolve_config(cli: &CliOverrides) -> Result<ServiceConfig> {
    let toml_config = match &cli.config_file {
        // An explicitly named file must exist
        Some(path) => {
            info!("Loading config file: {}", path.display());
            load_toml_config(path)?
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                load_toml_config(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                TomlConfig::default()
            }
        },
    };

    let database_path = cli
        .database
        .clone()
        .or_else(|| env_var(ENV_DATABASE).map(PathBuf::from))
        .or(toml_config.database)
        .unwrap_or_else(default_database_path);

    let bind_addr = cli
        .bind_addr
        .clone()
        .or_else(|| env_var(ENV_BIND))
        .or(toml_config.bind_addr)
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    // An empty key is the same as no key
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env_var(ENV_API_KEY))
        .or(toml_config.api_key)
        .filter(|key| !key.trim().is_empty());

    let environment = cli
        .environment
        .clone()
        .or_else(|| env_var(ENV_ENVIRONMENT))
        .or(toml_config.environment)
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let auto_process = match cli.auto_process {
        Some(value) => value,
        None => match env_var(ENV_AUTO_PROCESS) {
            Some(raw) => parse_bool(ENV_AUTO_PROCESS, &raw)?,
            None => toml_config.auto_process.unwrap_or(false),
        },
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| env_var(ENV_LOG_LEVEL))
        .or(toml_config.logging.level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    Ok(ServiceConfig {
        database_path,
        bind_addr,
        api_key,
        environment,
        auto_process,
        log_level,
    })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

/// Default config file location (`<config dir>/wfs/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wfs").join("config.toml"))
}

/// OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wfs"))
        .unwrap_or_else(|| PathBuf::from("./wfs_data"))
        .join("workflow.db")
}
