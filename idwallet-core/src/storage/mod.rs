//! Durable key-value storage
//!
//! Every store belongs to a namespace (`application`, `agent`, `vc`, ...).
//! Values are JSON documents. Each namespace also keeps an index of the keys
//! written through it under the namespace id, which backs `get_all` and
//! `clear`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

pub mod file_storage;
pub mod memory_storage;
pub mod secure_storage;

pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use secure_storage::SecureStorage;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid namespace '{0}'")]
    InvalidNamespace(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Invalid passphrase or corrupted entry")]
    InvalidPassphrase,

    #[error("Other error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Namespaced key-value store contract shared by plain and secure variants
#[async_trait]
pub trait Storage: Send + Sync {
    /// Namespace id; also the key under which the key index is kept
    fn namespace(&self) -> &str;

    /// Write `value` under `key` and record the key in the namespace index
    async fn add(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Read the value under `key`; `None` when absent or null
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Every indexed key with its value
    async fn get_all(&self) -> StorageResult<HashMap<String, Value>>;

    /// Delete `key` and drop it from the index
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Overwrite `key` without touching the index
    async fn update(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Delete every indexed key and the index itself
    async fn clear(&self) -> StorageResult<()>;
}

/// Typed helpers layered over [`Storage`]
#[async_trait]
pub trait StorageExt: Storage {
    /// Serialize and store a typed value
    async fn put<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.add(key, serde_json::to_value(value)?).await
    }

    /// Read and deserialize a typed value
    async fn fetch<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read a value, logging and swallowing any failure.
    ///
    /// Read failures on wallet state are treated as "no value".
    async fn fetch_or_none<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        match self.fetch(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(namespace = self.namespace(), key, error = %e, "storage read failed, treating as absent");
                None
            }
        }
    }

    /// Read a boolean flag; absent or unreadable flags are unset
    async fn flag(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(value)) if is_truthy(&value))
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// JSON truthiness, matching how flags were historically written
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Namespaces become directory names; reject anything path-like
pub(crate) fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty()
        || namespace.len() > 200
        || !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@'))
        || namespace.starts_with('.')
    {
        return Err(StorageError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

/// File name stem for `key`. Hex output never contains a separator or a
/// leading dot, so any key maps to a plain file inside its namespace.
pub(crate) fn key_file_stem(key: &str) -> String {
    hex::encode(key.as_bytes())
}

/// Append `key` to an index list unless already present, keeping it last
pub(crate) fn index_with(mut index: Vec<String>, key: &str) -> Vec<String> {
    index.retain(|k| k != key);
    index.push(key.to_string());
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("1")));
        assert!(is_truthy(&json!([])));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_validate_namespace() {
        assert!(validate_namespace("application").is_ok());
        assert!(validate_namespace("did:quarkid:abc").is_ok());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("../etc/passwd").is_err());
        assert!(validate_namespace("a/b").is_err());
        assert!(validate_namespace(".hidden").is_err());
    }

    #[test]
    fn test_key_file_stem_is_path_safe() {
        for key in ["did:quarkid:abc#key-1", "../escape", "a/b?c", ".hidden", "index"] {
            let stem = key_file_stem(key);
            assert!(stem.chars().all(|c| c.is_ascii_hexdigit()), "{}", stem);
        }
        assert_ne!(key_file_stem("index"), "index");
        assert_ne!(key_file_stem("ab"), key_file_stem("ba"));
    }

    #[test]
    fn test_index_with_deduplicates() {
        let index = vec!["a".to_string(), "b".to_string()];
        let index = index_with(index, "a");
        assert_eq!(index, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let storage = MemoryStorage::new("application");
        storage.put("ids", &vec!["m1", "m2"]).await.unwrap();

        let ids: Option<Vec<String>> = storage.fetch("ids").await.unwrap();
        assert_eq!(ids, Some(vec!["m1".to_string(), "m2".to_string()]));

        assert!(!storage.flag("introduction").await);
        storage.put("introduction", &true).await.unwrap();
        assert!(storage.flag("introduction").await);

        storage.put("notAList", &"text").await.unwrap();
        let wrong: Option<Vec<String>> = storage.fetch_or_none("notAList").await;
        assert!(wrong.is_none());
    }
}
