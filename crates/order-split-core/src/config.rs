use crate::allocation::AllocationPolicy;
use crate::registry::ResourceRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "ORDER_SPLIT_CONFIG";
pub const DB_PATH_ENV: &str = "ORDER_SPLIT_DB";
pub const HTTP_ADDR_ENV: &str = "ORDER_SPLIT_HTTP_ADDR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("priority share must be between 0 and 100 percent (got {0})")]
    InvalidPriorityShare(u32),
    #[error("resource registry is empty")]
    EmptyRegistry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub http_addr: String,
    pub allocation: AllocationPolicy,
    pub resources: ResourceRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("order-split.db"),
            http_addr: "0.0.0.0:3000".to_string(),
            allocation: AllocationPolicy::default(),
            resources: ResourceRegistry::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Reads the process environment: the file named by `ORDER_SPLIT_CONFIG`
    /// (defaults when unset), then the single-field overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        if let Some(db) = lookup(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(db);
        }
        if let Some(addr) = lookup(HTTP_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            config.http_addr = addr;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allocation.priority_share_percent > 100 {
            return Err(ConfigError::InvalidPriorityShare(
                self.allocation.priority_share_percent,
            ));
        }
        if self.resources.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        Ok(())
    }
}
