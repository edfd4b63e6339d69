use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// API key entry in config
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
    /// Tenant the key acts for. Keys without one act in system scope.
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Port to listen on
    pub port: u16,
    pub api_keys: Vec<ApiKeyEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("homebase")
                .join("homebase.db"),
            port: 8080,
            api_keys: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path
            .or_else(|| std::env::var("HOMEBASE_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("HOMEBASE_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(port) = std::env::var("HOMEBASE_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "HOMEBASE_PORT",
                value: port.clone(),
            })?;
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/homebase/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("homebase")
            .join("config.yaml")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {0:?}: {1}")]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}
