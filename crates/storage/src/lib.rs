//! Storage backends for the streamfs server.
//!
//! The transfer service only talks to a [`StorageBackend`]; path validation
//! and any access policy live in the backend. [`LocalStorage`] keeps every
//! path inside one root directory.

mod backend;
mod local;
mod validation;

pub use backend::{ReadHandle, StorageBackend, StorageFuture, WriteHandle, parent_dir};
pub use local::LocalStorage;
pub use validation::check_storage_path;

/// Errors produced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),
}

impl StorageError {
    /// Wraps an I/O error, promoting `NotFound`/`AlreadyExists` kinds.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
            _ => StorageError::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }

    /// Status code used when the error is reported to a remote caller.
    pub fn code(&self) -> i32 {
        match self {
            StorageError::InvalidPath(_) => 400,
            StorageError::NotFound(_) => 404,
            StorageError::AlreadyExists(_) => 409,
            StorageError::NotADirectory(_) | StorageError::IsADirectory(_) => 422,
            StorageError::Io { .. } => 500,
        }
    }
}
