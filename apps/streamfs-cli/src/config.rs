//! Client configuration: an optional TOML file merged with flags.
//!
//! ```toml
//! server = "files.example.net:7420"
//!
//! [transfer]
//! chunk_size = 65536
//! chunk_buffer_count = 16
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use streamfs_transfer::TransferConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing configuration {}", path.display()))
    }
}

/// Flag values that override the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_buffer_count: Option<usize>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: String,
    pub transfer: TransferConfig,
}

impl Settings {
    /// Flags win over the file. Both transfer values must end up set.
    pub fn resolve(file: FileConfig, flags: Overrides) -> anyhow::Result<Self> {
        let Some(server) = flags.server.or(file.server) else {
            bail!("no server address: pass --server or set `server` in the config file");
        };

        let chunk_size = flags
            .chunk_size
            .or(file.transfer.map(|t| t.chunk_size));
        let chunk_buffer_count = flags
            .chunk_buffer_count
            .or(file.transfer.map(|t| t.chunk_buffer_count));
        let (Some(chunk_size), Some(chunk_buffer_count)) = (chunk_size, chunk_buffer_count) else {
            bail!(
                "transfer sizing missing: pass --chunk-size and --buffer-count or add a [transfer] table"
            );
        };

        Ok(Self {
            server,
            transfer: TransferConfig::new(chunk_size, chunk_buffer_count)?,
        })
    }
}
