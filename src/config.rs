use crate::core::{DeskError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "ADDRDESK_CONFIG";

const HOST_ENV: &str = "ADDRDESK_DB_HOST";
const NAME_ENV: &str = "ADDRDESK_DB_NAME";
const USER_ENV: &str = "ADDRDESK_DB_USER";
const PASSWORD_ENV: &str = "ADDRDESK_DB_PASSWORD";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: ConnectionConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Connection parameters. Loaded once at startup and never mutated.
///
/// The SQLite connector opens `name` as the database path; host and
/// credentials are kept for diagnostics.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            name: "addrdesk.db".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration pointing at a database file, other fields defaulted.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Self {
        ConnectionConfig {
            name: path.as_ref().to_string_lossy().into_owned(),
            ..ConnectionConfig::default()
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Presentation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Rows shown per grid page
    pub page_size: usize,
    /// Ask before deleting records or reference values
    pub confirm_destructive: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            page_size: 50,
            confirm_destructive: true,
        }
    }
}

impl Config {
    /// Resolves and loads the configuration for this process.
    ///
    /// Lookup order: `explicit`, then `$ADDRDESK_CONFIG`, then
    /// `<config_dir>/addrdesk/config.toml` if present, then built-in defaults.
    /// `ADDRDESK_DB_*` variables override the loaded connection fields.
    pub fn resolve(explicit: Option<&Path>) -> Result<Config> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_config(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Config::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `ADDRDESK_DB_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        for (key, slot) in [
            (HOST_ENV, &mut db.host),
            (NAME_ENV, &mut db.name),
            (USER_ENV, &mut db.user),
            (PASSWORD_ENV, &mut db.password),
        ] {
            if let Some(value) = lookup(key) {
                debug!("Overriding {} from environment", key);
                *slot = value;
            }
        }
    }
}

/// `<config_dir>/addrdesk/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("addrdesk").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| DeskError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| DeskError::Config(e.to_string()))?;
    if config.database.name.trim().is_empty() {
        return Err(DeskError::Config("database.name must not be empty".to_string()));
    }
    if config.ui.page_size == 0 {
        return Err(DeskError::Config("ui.page_size must be at least 1".to_string()));
    }
    Ok(config)
}
