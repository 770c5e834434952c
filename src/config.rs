use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 9000;
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_USERS_PATH: &str = "data/users.json";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub data: Option<DataSection>,
    #[serde(default)]
    pub models: Option<ModelsSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSection {
    /// CSV with historical weather + consumption rows.
    pub history_path: Option<PathBuf>,
    /// JSON file backing the user store.
    pub users_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsSection {
    /// Directory holding saved model artifacts.
    pub dir: Option<PathBuf>,
    /// Retrain from history at startup even when saved artifacts exist.
    pub train_on_start: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 9000)
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Returns the history CSV path, or None when not configured.
    pub fn history_path(&self) -> Option<&Path> {
        let path = self.data.as_ref()?.history_path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Returns the user store path (default: data/users.json).
    pub fn users_path(&self) -> PathBuf {
        self.data
            .as_ref()
            .and_then(|d| d.users_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_USERS_PATH))
    }

    /// Returns the model artifact directory (default: models).
    pub fn models_dir(&self) -> PathBuf {
        self.models
            .as_ref()
            .and_then(|m| m.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
    }

    pub fn train_on_start(&self) -> bool {
        self.models
            .as_ref()
            .and_then(|m| m.train_on_start)
            .unwrap_or(false)
    }

    /// Returns the server port (default: 9000)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}
