//! Storage rooted at a local directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use streamfs_protocol::DirEntry;

use crate::backend::{ReadHandle, StorageBackend, StorageFuture, WriteHandle};
use crate::{StorageError, check_storage_path};

/// A [`StorageBackend`] that maps relative paths under `root`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if needed and returns the backend.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = Self::new(root);
        tokio::fs::create_dir_all(&storage.root)
            .await
            .map_err(|e| StorageError::from_io(&storage.root.to_string_lossy(), e))?;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path to its location under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        check_storage_path(path)?;
        Ok(self.root.join(path))
    }

    /// Like [`resolve`](Self::resolve) but maps `""` and `"."` to the root.
    fn resolve_dir(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() || path == "." {
            return Ok(self.root.clone());
        }
        self.resolve(path)
    }
}

fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

impl StorageBackend for LocalStorage {
    fn exists<'a>(&'a self, path: &'a str) -> StorageFuture<'a, bool> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            tokio::fs::try_exists(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))
        })
    }

    fn is_dir<'a>(&'a self, path: &'a str) -> StorageFuture<'a, bool> {
        Box::pin(async move {
            let full = self.resolve_dir(path)?;
            match tokio::fs::metadata(&full).await {
                Ok(meta) => Ok(meta.is_dir()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StorageError::from_io(path, e)),
            }
        })
    }

    fn create_directories<'a>(&'a self, path: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            tokio::fs::create_dir_all(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            tracing::debug!(path, "created directories");
            Ok(())
        })
    }

    fn open_write<'a>(&'a self, path: &'a str) -> StorageFuture<'a, WriteHandle> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            let file = tokio::fs::File::create(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            Ok(Box::new(file) as WriteHandle)
        })
    }

    fn open_read<'a>(&'a self, path: &'a str) -> StorageFuture<'a, ReadHandle> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            let meta = tokio::fs::metadata(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            if meta.is_dir() {
                return Err(StorageError::IsADirectory(path.to_string()));
            }
            let file = tokio::fs::File::open(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            Ok(Box::new(file) as ReadHandle)
        })
    }

    fn delete<'a>(&'a self, path: &'a str, recursive: bool) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            let meta = tokio::fs::symlink_metadata(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            let result = if !meta.is_dir() {
                tokio::fs::remove_file(&full).await
            } else if recursive {
                tokio::fs::remove_dir_all(&full).await
            } else {
                tokio::fs::remove_dir(&full).await
            };
            result.map_err(|e| StorageError::from_io(path, e))?;
            tracing::debug!(path, recursive, "deleted");
            Ok(())
        })
    }

    fn rename<'a>(&'a self, from: &'a str, to: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let src = self.resolve(from)?;
            let dst = self.resolve(to)?;
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::from_io(to, e))?;
            }
            tokio::fs::rename(&src, &dst)
                .await
                .map_err(|e| StorageError::from_io(from, e))
        })
    }

    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let src = self.resolve(from)?;
            let dst = self.resolve(to)?;
            let meta = tokio::fs::metadata(&src)
                .await
                .map_err(|e| StorageError::from_io(from, e))?;
            if meta.is_dir() {
                return Err(StorageError::IsADirectory(from.to_string()));
            }
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::from_io(to, e))?;
            }
            tokio::fs::copy(&src, &dst)
                .await
                .map_err(|e| StorageError::from_io(from, e))?;
            Ok(())
        })
    }

    fn list<'a>(&'a self, path: &'a str) -> StorageFuture<'a, Vec<DirEntry>> {
        Box::pin(async move {
            let full = self.resolve_dir(path)?;
            let meta = tokio::fs::metadata(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            if !meta.is_dir() {
                return Err(StorageError::NotADirectory(path.to_string()));
            }

            let mut reader = tokio::fs::read_dir(&full)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
            let mut entries = Vec::new();
            while let Some(entry) = reader
                .next_entry()
                .await
                .map_err(|e| StorageError::from_io(path, e))?
            {
                // Entries that vanish mid-listing are skipped.
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                entries.push(DirEntry {
                    path: join_relative(path, &name),
                    name,
                    is_dir: meta.is_dir(),
                    size: if meta.is_dir() { 0 } else { meta.len() },
                    modified: meta.modified().ok().map(DateTime::<Utc>::from),
                });
            }

            entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            Ok(entries)
        })
    }
}
