//! File-backed storage
//!
//! Layout under the root directory:
//! ```text
//! <root>/<namespace>/<hex(key)>.json    one JSON document per key
//! <root>/<namespace>.index.json         JSON array of indexed keys
//! ```
//!
//! Keys are arbitrary strings (DID URLs carry `#`, `/` and `?`), so file
//! names are the hex encoding of the key. The index keeps the originals.

use super::{index_with, key_file_stem, validate_namespace, Storage, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::trace;

/// Plain (not encrypted) file storage for one namespace
pub struct FileStorage {
    namespace: String,
    root: PathBuf,
}

impl FileStorage {
    /// Open a namespace under `root`, creating directories as needed
    pub async fn open(root: impl Into<PathBuf>, namespace: impl Into<String>) -> StorageResult<Self> {
        let storage = FileStorage {
            namespace: namespace.into(),
            root: root.into(),
        };
        validate_namespace(&storage.namespace)?;
        fs::create_dir_all(storage.namespace_dir()).await?;
        Ok(storage)
    }

    fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(format!("{}.index.json", self.namespace))
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.namespace_dir().join(format!("{}.json", key_file_stem(key)))
    }

    async fn read_index(&self) -> StorageResult<Vec<String>> {
        match read_optional(&self.index_path()).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: &[String]) -> StorageResult<()> {
        write_atomic(&self.index_path(), &serde_json::to_vec(index)?).await
    }
}

/// Read a file, mapping "not found" to `None`
pub(crate) async fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write file atomically (write to temp, then rename)
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Remove a file, ignoring "not found"
pub(crate) async fn remove_optional(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add(&self, key: &str, value: Value) -> StorageResult<()> {
        write_atomic(&self.value_path(key), &serde_json::to_vec(&value)?).await?;
        let index = index_with(self.read_index().await?, key);
        self.write_index(&index).await?;
        trace!(namespace = %self.namespace, key, "stored value");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        match read_optional(&self.value_path(key)).await? {
            Some(bytes) => {
                let value: Value = serde_json::from_slice(&bytes)?;
                Ok((!value.is_null()).then_some(value))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> StorageResult<HashMap<String, Value>> {
        let mut all = HashMap::new();
        for key in self.read_index().await? {
            if let Some(value) = self.get(&key).await? {
                all.insert(key, value);
            }
        }
        Ok(all)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        remove_optional(&self.value_path(key)).await?;
        let mut index = self.read_index().await?;
        index.retain(|k| k != key);
        self.write_index(&index).await
    }

    async fn update(&self, key: &str, value: Value) -> StorageResult<()> {
        write_atomic(&self.value_path(key), &serde_json::to_vec(&value)?).await
    }

    async fn clear(&self) -> StorageResult<()> {
        match fs::remove_dir_all(self.namespace_dir()).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        remove_optional(&self.index_path()).await?;
        fs::create_dir_all(self.namespace_dir()).await?;
        Ok(())
    }
}
