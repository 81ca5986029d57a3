//! Metadata requests mapped onto backend calls.

use tracing::{debug, warn};

use streamfs_protocol::{MetadataRequest, Reply};
use streamfs_storage::{StorageBackend, StorageError};

/// Runs one metadata request. Failures become `Reply::Error`.
pub async fn handle_metadata<S>(storage: &S, request: MetadataRequest) -> Reply
where
    S: StorageBackend + ?Sized,
{
    let name = request.name();
    match dispatch(storage, request).await {
        Ok(reply) => {
            debug!(op = name, "metadata request served");
            reply
        }
        Err(e) => {
            warn!(op = name, "metadata request failed: {e}");
            Reply::error(e.code(), e.to_string())
        }
    }
}

async fn dispatch<S>(storage: &S, request: MetadataRequest) -> Result<Reply, StorageError>
where
    S: StorageBackend + ?Sized,
{
    match request {
        MetadataRequest::Exists { path } => {
            let exists = storage.exists(&path).await?;
            Ok(Reply::Exists { exists })
        }
        MetadataRequest::CreateDirectory { path } => {
            storage.create_directories(&path).await?;
            Ok(Reply::Done)
        }
        MetadataRequest::Delete { path, recursive } => {
            if !storage.exists(&path).await? {
                return Err(StorageError::NotFound(path));
            }
            storage.delete(&path, recursive).await?;
            Ok(Reply::Done)
        }
        MetadataRequest::Move {
            from,
            to,
            overwrite,
        } => {
            check_transfer_targets(storage, &from, &to, overwrite).await?;
            storage.rename(&from, &to).await?;
            Ok(Reply::Done)
        }
        MetadataRequest::Copy {
            from,
            to,
            overwrite,
        } => {
            check_transfer_targets(storage, &from, &to, overwrite).await?;
            storage.copy(&from, &to).await?;
            Ok(Reply::Done)
        }
        MetadataRequest::List { path } => {
            let entries = storage.list(&path).await?;
            Ok(Reply::Entries { entries })
        }
    }
}

/// Source must exist; an existing destination needs `overwrite`.
async fn check_transfer_targets<S>(
    storage: &S,
    from: &str,
    to: &str,
    overwrite: bool,
) -> Result<(), StorageError>
where
    S: StorageBackend + ?Sized,
{
    if !storage.exists(from).await? {
        return Err(StorageError::NotFound(from.to_string()));
    }
    if !overwrite && storage.exists(to).await? {
        return Err(StorageError::AlreadyExists(to.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamfs_storage::LocalStorage;

    async fn storage() -> (LocalStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (LocalStorage::open(dir.path()).await.unwrap(), dir)
    }

    fn code(reply: &Reply) -> Option<i32> {
        match reply {
            Reply::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn exists_and_create_directory() {
        let (storage, _dir) = storage().await;
        let exists = MetadataRequest::Exists { path: "a/b".into() };

        assert_eq!(
            handle_metadata(&storage, exists.clone()).await,
            Reply::Exists { exists: false }
        );
        assert_eq!(
            handle_metadata(
                &storage,
                MetadataRequest::CreateDirectory { path: "a/b".into() }
            )
            .await,
            Reply::Done
        );
        assert_eq!(
            handle_metadata(&storage, exists).await,
            Reply::Exists { exists: true }
        );
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (storage, _dir) = storage().await;
        let reply = handle_metadata(
            &storage,
            MetadataRequest::Delete {
                path: "ghost".into(),
                recursive: true,
            },
        )
        .await;
        assert_eq!(code(&reply), Some(404));
    }

    #[tokio::test]
    async fn move_refuses_existing_target_without_overwrite() {
        let (storage, dir) = storage().await;
        std::fs::write(dir.path().join("a"), b"a").unwrap();
        std::fs::write(dir.path().join("b"), b"b").unwrap();

        let request = |overwrite| MetadataRequest::Move {
            from: "a".into(),
            to: "b".into(),
            overwrite,
        };
        assert_eq!(code(&handle_metadata(&storage, request(false)).await), Some(409));
        assert_eq!(std::fs::read(dir.path().join("b")).unwrap(), b"b");

        assert_eq!(handle_metadata(&storage, request(true)).await, Reply::Done);
        assert!(!dir.path().join("a").exists());
        assert_eq!(std::fs::read(dir.path().join("b")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let (storage, _dir) = storage().await;
        let reply = handle_metadata(
            &storage,
            MetadataRequest::Copy {
                from: "nope".into(),
                to: "x".into(),
                overwrite: true,
            },
        )
        .await;
        assert_eq!(code(&reply), Some(404));
    }

    #[tokio::test]
    async fn list_root_and_invalid_path() {
        let (storage, dir) = storage().await;
        std::fs::write(dir.path().join("Zed.txt"), b"z").unwrap();
        std::fs::write(dir.path().join("alpha.txt"), b"a").unwrap();

        let Reply::Entries { entries } =
            handle_metadata(&storage, MetadataRequest::List { path: String::new() }).await
        else {
            panic!("expected entries");
        };
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "Zed.txt"]);

        let reply =
            handle_metadata(&storage, MetadataRequest::List { path: "../up".into() }).await;
        assert_eq!(code(&reply), Some(400));
    }
}
