use std::path::{Component, Path};

use crate::StorageError;

/// Checks that `path` names a location inside a storage root.
///
/// Storage paths are relative and `/`-separated. A path that is empty,
/// rooted, drive- or share-prefixed, contains `..`, or carries a NUL byte
/// could resolve outside the root and is rejected.
pub fn check_storage_path(path: &str) -> Result<(), StorageError> {
    let reject = |reason: &str| Err(StorageError::InvalidPath(format!("{path:?}: {reason}")));

    if path.is_empty() {
        return reject("empty storage path");
    }
    if path.contains('\0') {
        return reject("NUL byte in storage path");
    }
    if path.starts_with("\\\\") {
        return reject("network share outside the storage root");
    }

    let path_ref = Path::new(path);
    if path_ref.is_absolute() {
        return reject("storage paths are relative to the root");
    }
    for component in path_ref.components() {
        match component {
            Component::ParentDir => return reject("`..` would leave the storage root"),
            Component::RootDir => return reject("storage paths are relative to the root"),
            Component::Prefix(_) => return reject("drive prefix outside the storage root"),
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}
