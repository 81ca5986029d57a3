use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correlation identifier echoed on every frame of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferMark(String);

impl TransferMark {
    /// Generates a fresh random mark (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransferMark {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TransferMark {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Observational notification about a transfer in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub is_completed: bool,
    pub message: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Cumulative bytes moved so far.
    #[serde(default)]
    pub bytes_transferred: u64,
}

/// A single entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Path relative to the storage root, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}
