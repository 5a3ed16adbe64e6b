use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Optional TOML config file. Every section and key may be omitted.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    pub listen: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

/// Effective settings after merging CLI flags, config file and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// CLI flags win over the file, the file wins over defaults.
    pub fn resolve(self, listen: Option<String>, data_dir: Option<PathBuf>) -> Settings {
        Settings {
            listen: listen
                .or(self.server.listen)
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            data_dir: data_dir
                .or(self.storage.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}
