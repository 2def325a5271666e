use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::format::DEFAULT_TRUNCATE_AT;

/// Viewer configuration, read from an optional TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding index.json and the per-run folders written by the ETL
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// tracing filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Number of characters shown per sample field before truncation
    #[serde(default = "default_truncate_at")]
    pub truncate_at: usize,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_truncate_at() -> usize {
    DEFAULT_TRUNCATE_AT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            log_filter: default_log_filter(),
            truncate_at: default_truncate_at(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
