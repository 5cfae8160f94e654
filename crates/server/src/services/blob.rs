//! Product image storage.
//!
//! Products reference images by key (a relative path such as
//! `kitchen/kettle.jpg`); the bytes live outside the database.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from blob reads.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Key is empty, absolute, or escapes the root.
    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),

    /// Nothing stored under this key.
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that `key` is a plain relative path: non-empty, not absolute, and
/// made only of normal components (no `.` or `..`).
///
/// # Errors
///
/// Returns `BlobError::InvalidKey` otherwise.
pub fn validate_key(key: &str) -> Result<&Path, BlobError> {
    let relative = Path::new(key);
    let plain = !key.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(relative)
    } else {
        Err(BlobError::InvalidKey(key.to_owned()))
    }
}

/// Read-only access to stored image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the bytes stored under `key`.
    async fn read(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Whether anything is stored under `key`.
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;
}

/// Blobs stored as files beneath a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key onto a path under the root, refusing anything that could
    /// leave it.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        Ok(self.root.join(validate_key(key)?))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(key.to_owned()))
            }
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

/// Blobs held in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `key`, replacing any previous value.
    pub async fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().await.insert(key.into(), bytes.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        validate_key(key)?;
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        validate_key(key)?;
        Ok(self.blobs.read().await.contains_key(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = FsBlobStore::new("/srv/images");
        for key in ["", "../etc/passwd", "/etc/passwd", "a/../../b", "./a.jpg"] {
            assert!(
                matches!(store.resolve(key), Err(BlobError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        assert_eq!(
            store.resolve("kitchen/kettle.jpg").unwrap(),
            PathBuf::from("/srv/images/kitchen/kettle.jpg")
        );
    }

    #[tokio::test]
    async fn test_fs_read_missing_is_not_found() {
        let store = FsBlobStore::new(std::env::temp_dir());
        let key = format!("emporium-missing-{}.jpg", uuid::Uuid::new_v4());
        assert!(matches!(
            store.read(&key).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_read_existing_file() {
        let dir = std::env::temp_dir().join(format!("emporium-blobs-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("mug.png"), b"png-bytes")
            .await
            .unwrap();

        let store = FsBlobStore::new(&dir);
        assert_eq!(store.read("mug.png").await.unwrap(), b"png-bytes");
        assert!(store.exists("mug.png").await.unwrap());
        assert!(!store.exists("cup.png").await.unwrap());
        assert!(matches!(
            store.exists("../mug.png").await,
            Err(BlobError::InvalidKey(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBlobStore::new();
        store.put("a.jpg", b"abc".to_vec()).await;
        assert_eq!(store.read("a.jpg").await.unwrap(), b"abc");
        assert!(store.read("b.jpg").await.is_err());
        assert!(store.exists("a.jpg").await.unwrap());
        assert!(!store.exists("b.jpg").await.unwrap());
        assert!(matches!(
            store.exists("/a.jpg").await,
            Err(BlobError::InvalidKey(_))
        ));
    }
}
