//! Daemon configuration.
//!
//! Stored as TOML, by default at:
//! - Linux: `~/.config/streamfs/streamfsd.toml`
//! - Windows: `%APPDATA%/streamfs/streamfsd.toml`
//!
//! The `[transfer]` table is required; a missing file or table is a startup
//! error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use streamfs_transfer::TransferConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory every stored path is resolved under.
    pub storage_root: PathBuf,

    /// Chunk sizing shared with clients.
    pub transfer: TransferConfig,
}

fn default_listen() -> String {
    "0.0.0.0:7420".into()
}

impl Config {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing configuration {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Returns the platform-specific configuration file path.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("streamfs").join("streamfsd.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("streamfs")
            .join("streamfsd.toml"))
    }
}
