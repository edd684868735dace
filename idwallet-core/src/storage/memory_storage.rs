//! In-memory storage for tests and ephemeral wallets

use super::{index_with, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Helper to convert poison errors into StorageError
fn handle_poison<T>(_err: PoisonError<T>) -> StorageError {
    StorageError::Other("Lock poisoned: a thread panicked while holding the lock".to_string())
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, Value>,
    index: Vec<String>,
}

/// In-memory namespace (non-persistent). Clones share the same contents.
#[derive(Clone)]
pub struct MemoryStorage {
    namespace: String,
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    /// Create an empty namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        MemoryStorage {
            namespace: namespace.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Number of stored values, indexed or not
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.values.len()).unwrap_or(0)
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(handle_poison)?;
        inner.values.insert(key.to_string(), value);
        let index = std::mem::take(&mut inner.index);
        inner.index = index_with(index, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let inner = self.inner.read().map_err(handle_poison)?;
        Ok(inner.values.get(key).filter(|v| !v.is_null()).cloned())
    }

    async fn get_all(&self) -> StorageResult<HashMap<String, Value>> {
        let inner = self.inner.read().map_err(handle_poison)?;
        Ok(inner
            .index
            .iter()
            .filter_map(|key| inner.values.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(handle_poison)?;
        inner.values.remove(key);
        inner.index.retain(|k| k != key);
        Ok(())
    }

    async fn update(&self, key: &str, value: Value) -> StorageResult<()> {
        self.inner
            .write()
            .map_err(handle_poison)?
            .values
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(handle_poison)?;
        inner.values.clear();
        inner.index.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new("application");

        storage.add("pin", json!("hash")).await.unwrap();
        assert_eq!(storage.get("pin").await.unwrap(), Some(json!("hash")));
        assert_eq!(storage.get("missing").await.unwrap(), None);

        storage.remove("pin").await.unwrap();
        assert_eq!(storage.get("pin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_does_not_index() {
        let storage = MemoryStorage::new("agent");

        storage.add("a", json!(1)).await.unwrap();
        storage.update("b", json!(2)).await.unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("a"), Some(&json!(1)));
        assert_eq!(storage.get("b").await.unwrap(), Some(json!(2)));

        storage.clear().await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let storage = MemoryStorage::new("vc");
        let clone = storage.clone();

        storage.add("k", json!({"x": 1})).await.unwrap();
        assert_eq!(clone.get("k").await.unwrap(), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_accepts_any_key() {
        let storage = MemoryStorage::new("agent");

        storage.add("did:quarkid:abc#key-1", json!(1)).await.unwrap();
        storage.add("", json!(2)).await.unwrap();
        assert_eq!(
            storage.get("did:quarkid:abc#key-1").await.unwrap(),
            Some(json!(1))
        );
        assert_eq!(storage.get_all().await.unwrap().len(), 2);
    }
}
