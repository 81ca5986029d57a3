//! Backend trait consumed by the transfer service.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use streamfs_protocol::DirEntry;

use crate::StorageError;

/// A boxed future returned by backend methods.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Open handle for writing a file. Dropping it closes the file.
pub type WriteHandle = Box<dyn AsyncWrite + Send + Unpin>;

/// Open handle for reading a file. Dropping it closes the file.
pub type ReadHandle = Box<dyn AsyncRead + Send + Unpin>;

/// Directory-oriented file store.
///
/// All paths are relative and `/`-separated. Implementations decide which
/// paths are acceptable and report the rest as
/// [`StorageError::InvalidPath`].
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns `true` if a file or directory exists at `path`.
    fn exists<'a>(&'a self, path: &'a str) -> StorageFuture<'a, bool>;

    /// Returns `true` if `path` exists and is a directory.
    fn is_dir<'a>(&'a self, path: &'a str) -> StorageFuture<'a, bool>;

    /// Creates `path` and any missing parents. Succeeds if it already exists.
    fn create_directories<'a>(&'a self, path: &'a str) -> StorageFuture<'a, ()>;

    /// Creates or truncates the file at `path`. Parents must exist.
    fn open_write<'a>(&'a self, path: &'a str) -> StorageFuture<'a, WriteHandle>;

    /// Opens the file at `path` for reading.
    fn open_read<'a>(&'a self, path: &'a str) -> StorageFuture<'a, ReadHandle>;

    /// Deletes a file, or a directory (its contents too when `recursive`).
    fn delete<'a>(&'a self, path: &'a str, recursive: bool) -> StorageFuture<'a, ()>;

    /// Moves `from` to `to`, replacing a file already at `to`.
    fn rename<'a>(&'a self, from: &'a str, to: &'a str) -> StorageFuture<'a, ()>;

    /// Copies the file `from` to `to`, replacing a file already at `to`.
    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> StorageFuture<'a, ()>;

    /// Lists the entries of the directory at `path` (`""` is the root).
    fn list<'a>(&'a self, path: &'a str) -> StorageFuture<'a, Vec<DirEntry>>;
}

/// Returns the parent directory of a `/`-separated relative path, or `None`
/// for a top-level name.
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}
