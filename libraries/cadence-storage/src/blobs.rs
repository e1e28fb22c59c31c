//! Blob storage implementations
//!
//! Objects are never overwritten: uploading to an existing key fails, the
//! same way the hosted bucket behaves with `upsert: false`.

use async_trait::async_trait;
use cadence_core::{
    error::{CadenceError, Result},
    BlobStorage,
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        path
    )
}

/// Reject keys that would escape the bucket directory
fn validate_key(key: &str) -> Result<()> {
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
        return Err(CadenceError::invalid_input(format!("invalid object key: {key}")));
    }
    Ok(())
}

/// Blob storage on the local filesystem
///
/// Layout: `<base_path>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FileBlobStorage {
    base_path: PathBuf,
    base_url: String,
}

impl FileBlobStorage {
    pub fn new(base_path: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            base_path,
            base_url: base_url.into(),
        }
    }

    /// Create bucket directories
    pub async fn initialize(&self, buckets: &[&str]) -> Result<()> {
        for bucket in buckets {
            fs::create_dir_all(self.base_path.join(bucket)).await?;
        }
        Ok(())
    }

    /// Filesystem location of a stored object
    pub fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.base_path.join(bucket).join(path)
    }
}

#[async_trait]
impl BlobStorage for FileBlobStorage {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String> {
        validate_key(key)?;
        let path = self.object_path(bucket, key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    CadenceError::blob(format!("The resource already exists: {bucket}/{key}"))
                }
                _ => CadenceError::Io(e),
            })?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        info!(bucket, key, size = bytes.len(), "Stored object");
        Ok(key.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        Ok(public_url(&self.base_url, bucket, path))
    }
}

/// Blob storage held in memory
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    base_url: String,
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryBlobStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Make subsequent uploads fail (or recover)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored bytes for an object, if present
    pub async fn get(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Number of stored objects in `bucket`
    pub async fn count(&self, bucket: &str) -> usize {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CadenceError::blob("Failed to fetch"));
        }
        validate_key(key)?;

        let mut objects = self.objects.write().await;
        let id = (bucket.to_string(), key.to_string());
        if objects.contains_key(&id) {
            return Err(CadenceError::blob(format!(
                "The resource already exists: {bucket}/{key}"
            )));
        }

        debug!(bucket, key, size = bytes.len(), "Stored object in memory");
        objects.insert(id, bytes);
        Ok(key.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        Ok(public_url(&self.base_url, bucket, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("https://cdn.example/", "songs", "song-a-1"),
            "https://cdn.example/storage/v1/object/public/songs/song-a-1"
        );
    }

    #[test]
    fn keys_cannot_escape_bucket() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("song-title-abc").is_ok());
    }

    #[tokio::test]
    async fn memory_upload_never_overwrites() {
        let blobs = MemoryBlobStorage::new("http://localhost");
        blobs.upload("songs", "a", vec![1]).await.unwrap();
        assert!(blobs.upload("songs", "a", vec![2]).await.is_err());
        assert_eq!(blobs.get("songs", "a").await, Some(vec![1]));
    }

    #[tokio::test]
    async fn file_upload_writes_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FileBlobStorage::new(dir.path().to_path_buf(), "http://localhost");
        blobs.initialize(&["songs"]).await.unwrap();

        let path = blobs.upload("songs", "song-x", b"abc".to_vec()).await.unwrap();
        assert_eq!(path, "song-x");
        let written = std::fs::read(blobs.object_path("songs", "song-x")).unwrap();
        assert_eq!(written, b"abc");

        assert!(blobs.upload("songs", "song-x", b"def".to_vec()).await.is_err());
    }
}
