use serde::{Deserialize, Serialize};

use crate::types::{DirEntry, TransferMark};

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// First message on every channel; selects the operation for the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// Client streams chunks, server acknowledges each completed file.
    Upload { mark: TransferMark },
    /// Server streams the named file back.
    #[serde(rename_all = "camelCase")]
    Download { mark: TransferMark, file_name: String },
    /// Plain request/response operation.
    Metadata { request: MetadataRequest },
}

impl Call {
    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Upload { .. } => "upload",
            Call::Download { .. } => "download",
            Call::Metadata { request } => request.name(),
        }
    }
}

/// Directory and file metadata operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetadataRequest {
    Exists {
        path: String,
    },
    CreateDirectory {
        path: String,
    },
    Delete {
        path: String,
        #[serde(default)]
        recursive: bool,
    },
    Move {
        from: String,
        to: String,
        #[serde(default)]
        overwrite: bool,
    },
    Copy {
        from: String,
        to: String,
        #[serde(default)]
        overwrite: bool,
    },
    List {
        path: String,
    },
}

impl MetadataRequest {
    pub fn name(&self) -> &'static str {
        match self {
            MetadataRequest::Exists { .. } => "exists",
            MetadataRequest::CreateDirectory { .. } => "create_directory",
            MetadataRequest::Delete { .. } => "delete",
            MetadataRequest::Move { .. } => "move",
            MetadataRequest::Copy { .. } => "copy",
            MetadataRequest::List { .. } => "list",
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Response to a [`MetadataRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Done,
    Exists { exists: bool },
    Entries { entries: Vec<DirEntry> },
    Error { code: i32, message: String },
}

impl Reply {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Reply::Error {
            code,
            message: message.into(),
        }
    }
}
