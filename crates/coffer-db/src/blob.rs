//! blob storage for encrypted file contents.
//!
//! blobs are opaque byte strings addressed by a random key. coffer only ever
//! writes ciphertext here; the store does no encryption of its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, Result};

/// length of a blob key in bytes, before hex encoding.
const BLOB_KEY_BYTES: usize = 16;

/// generate a fresh random blob key.
pub fn generate_blob_key() -> String {
    use rand::Rng;
    let bytes: [u8; BLOB_KEY_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// keys are hex only, so they can never escape the store directory.
fn validate_key(key: &str) -> Result<()> {
    if key.len() == BLOB_KEY_BYTES * 2 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::Blob(format!("invalid blob key: {key:?}")))
    }
}

/// storage for encrypted file blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// write `data` under `key`, replacing any previous contents.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// read the blob under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// delete the blob under `key`. deleting a missing blob is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// every key currently stored, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// blob store backed by a directory, one file per blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// open (and create if needed) a blob directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("blob {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // anything else in the directory was not written by us
            if let Some(name) = entry.file_name().to_str() {
                if validate_key(name).is_ok() {
                    keys.push(name.to_string());
                }
            }
        }
        Ok(keys)
    }
}

/// in-process blob store, used with in-memory databases.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("blob {key}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}
