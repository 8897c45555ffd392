//! Key-value store implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::Store;

/// Name of the document `FileStore` keeps under its base directory
pub const STORAGE_FILE: &str = "local-storage.json";

/// Fails when writing `value` under `key` would push the map past `quota` bytes
fn check_quota(kv: &HashMap<String, String>, key: &str, value: &str, quota: Option<usize>) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let others: usize = kv
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    let needed = others + key.len() + value.len();

    if needed > quota {
        return Err(StorageError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

/// In-memory store, lost on drop
#[derive(Default)]
pub struct MemoryStore {
    kv: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the total bytes of keys plus values
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let kv = self.kv.read().await;
        Ok(kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        check_quota(&kv, key, value, self.quota)?;
        kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.remove(key);
        Ok(())
    }
}

/// JSON file-based store: the whole map lives in one document that is
/// rewritten on every change
pub struct FileStore {
    base_path: PathBuf,
    kv: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            kv: Arc::new(RwLock::new(HashMap::new())),
            quota: None,
        }
    }

    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota = bytes;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.base_path.join(STORAGE_FILE)
    }

    /// Creates the directory and loads any existing document. An unreadable
    /// document is logged and replaced on the next write.
    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let path = self.path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<HashMap<String, String>>(&content) {
            Ok(loaded) => {
                tracing::debug!(path = %path.display(), entries = loaded.len(), "Loaded local storage");
                *self.kv.write().await = loaded;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable local storage");
            }
        }

        Ok(())
    }

    async fn flush(&self, kv: &HashMap<String, String>) -> Result<(), StorageError> {
        let path = self.path();
        let tmp = tmp_path(&path);
        let content = serde_json::to_string_pretty(kv)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let kv = self.kv.read().await;
        Ok(kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        check_quota(&kv, key, value, self.quota)?;

        let previous = kv.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&kv).await {
            match previous {
                Some(previous) => kv.insert(key.to_string(), previous),
                None => kv.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        let Some(previous) = kv.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&kv).await {
            kv.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
