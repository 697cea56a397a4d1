//! File-backed key-value storage
//!
//! Earlier browser builds kept everything in localStorage under a fixed
//! key. This store keeps the same model: each key maps to one file in a
//! root directory, writes go through a temp file and rename so a crash
//! never leaves a half-written document.

use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Key-value store rooted at a data directory
#[derive(Clone)]
pub struct KvStore {
    root: PathBuf,
}

impl KvStore {
    /// Create a new store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Key-value store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Read the value stored under `key`, or None if never written
    pub async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);

        if !path.exists() {
            return Ok(None);
        }

        let value = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Storage(format!("failed to read key {}: {}", key, e)))?;

        tracing::debug!("Read key: {} ({} bytes)", key, value.len());

        Ok(Some(value))
    }

    /// Write `value` under `key`, replacing any previous value
    pub async fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write key {}: {}", key, e)))?;
        file.write_all(value.as_bytes())
            .await
            .map_err(|e| AppError::Storage(format!("failed to write key {}: {}", key, e)))?;
        file.sync_all().await?;

        fs::rename(temp_path, &path).await?;

        tracing::debug!("Wrote key: {} ({} bytes)", key, value.len());

        Ok(())
    }

    /// Remove `key`; not an error if it was never written
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).await?;

        tracing::debug!("Removed key: {}", key);

        Ok(())
    }

    /// Check whether `key` holds a value
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).exists())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = KvStore::new(temp_dir.path().join("data"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_read_absent_key_is_none() {
        let (store, _temp) = create_test_store().await;

        assert_eq!(store.read("diaryAppData").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;

        store.write("diaryAppData", r#"{"entries":[]}"#).await.unwrap();

        let value = store.read("diaryAppData").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"entries":[]}"#));
    }

    #[tokio::test]
    async fn test_write_replaces_previous_value() {
        let (store, _temp) = create_test_store().await;

        store.write("k", "first").await.unwrap();
        store.write("k", "second").await.unwrap();

        assert_eq!(store.read("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, _temp) = create_test_store().await;

        store.write("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (store, _temp) = create_test_store().await;

        store.write("diaryAppData", "{}").await.unwrap();
        store.write("diaryAppVisited", "true").await.unwrap();

        store.remove("diaryAppData").await.unwrap();

        assert_eq!(
            store.read("diaryAppVisited").await.unwrap().as_deref(),
            Some("true")
        );
    }
}
