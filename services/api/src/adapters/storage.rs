//! services/api/src/adapters/storage.rs
//!
//! Local-disk implementation of the `ObjectStorage` port. Objects live under
//! `{root}/{bucket}/{path}` and are served by the router under `/storage`.

use async_trait::async_trait;
use bytes::Bytes;
use campus_portal_core::ports::{ObjectStorage, PortError, PortResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The URL prefix the router serves stored objects from.
pub const STORAGE_ROUTE: &str = "/storage";

#[derive(Clone, Debug)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `bucket/path` under the root, refusing anything that could escape it.
    fn object_path(&self, bucket: &str, path: &str) -> PortResult<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in std::iter::once(bucket).chain(path.split('/')) {
            let safe = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && !segment.contains('\\')
                && !segment.contains('\0');
            if !safe {
                return Err(PortError::Validation(format!(
                    "'{}/{}' is not a valid object path",
                    bucket, path
                )));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload_file(&self, bucket: &str, path: &str, bytes: Bytes) -> PortResult<String> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!(path = %target.display(), size = bytes.len(), "Stored object");
        Ok(self.public_url(bucket, path))
    }

    async fn remove_file(&self, bucket: &str, path: &str) -> PortResult<()> {
        let target = self.object_path(bucket, path)?;
        tokio::fs::remove_file(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PortError::NotFound(format!("Object {}/{} not found", bucket, path)),
            _ => PortError::Unexpected(e.to_string()),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}{}/{}/{}", self.public_base_url, STORAGE_ROUTE, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch() -> LocalObjectStorage {
        let root = std::env::temp_dir().join(format!("portal-storage-{}", Uuid::new_v4()));
        LocalObjectStorage::new(root, "http://localhost:3000/")
    }

    #[tokio::test]
    async fn upload_replace_and_remove() {
        let storage = scratch();
        let url = storage
            .upload_file("avatars", "u1/avatar.png", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/storage/avatars/u1/avatar.png");

        storage
            .upload_file("avatars", "u1/avatar.png", Bytes::from_static(b"two"))
            .await
            .unwrap();
        let on_disk = tokio::fs::read(storage.root().join("avatars/u1/avatar.png"))
            .await
            .unwrap();
        assert_eq!(on_disk, b"two");

        storage.remove_file("avatars", "u1/avatar.png").await.unwrap();
        assert!(matches!(
            storage.remove_file("avatars", "u1/avatar.png").await,
            Err(PortError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let storage = scratch();
        for path in ["../escape.txt", "a//b", "a/./b", ""] {
            let result = storage
                .upload_file("notes", path, Bytes::from_static(b"x"))
                .await;
            assert!(matches!(result, Err(PortError::Validation(_))), "{path}");
        }
        assert!(matches!(
            storage.upload_file("..", "x.pdf", Bytes::from_static(b"x")).await,
            Err(PortError::Validation(_))
        ));
    }
}
