//src/config.rs
use crate::controller::NavigatorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE_NAME: &str = "config.toml";
pub(crate) const APP_DIR: &str = "kw8-nav";
const CONFIG_ENV_VAR: &str = "KW8_NAV_CONFIG_DIR"; // Environment variable name

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid log level directive: {0}")]
    InvalidLogLevel(String),
    #[error("Workouts tab name cannot be empty.")]
    EmptyTab,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Athlete whose plan assignments feed variant resolution.
    pub default_user: Option<String>,
    pub navigation: NavigatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            default_user: None,
            navigation: NavigatorConfig::default(),
        }
    }
}

impl Config {
    pub fn set_log_level(&mut self, level: &str) -> Result<(), Error> {
        let level = level.trim();
        EnvFilter::try_new(level).map_err(|_| Error::InvalidLogLevel(level.to_string()))?;
        self.log_level = level.to_string();
        Ok(())
    }

    pub fn set_default_workouts_tab(&mut self, tab: &str) -> Result<(), Error> {
        let tab = tab.trim();
        if tab.is_empty() {
            return Err(Error::EmptyTab);
        }
        self.navigation.default_workouts_tab = tab.to_string();
        Ok(())
    }
}

/// Determines the path to the configuration file.
/// Exposed at crate root as get_config_path_util
pub fn get_config_path() -> Result<PathBuf, Error> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                warn!(
                    env_var = CONFIG_ENV_VAR,
                    path = %path.display(),
                    "Config directory override is not a directory, creating it"
                );
                fs::create_dir_all(&path)?;
            }
            path
        }
        None => {
            let base_config_dir = dirs::config_dir().ok_or(Error::CannotDetermineConfigDir)?;
            base_config_dir.join(APP_DIR)
        }
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path, writing
/// the defaults first when the file does not exist yet.
pub fn load(config_path: &Path) -> Result<Config, Error> {
    if !config_path.exists() {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&config_content)?;
    Ok(config)
}

/// Saves the configuration to the TOML file.
pub fn save(config_path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
