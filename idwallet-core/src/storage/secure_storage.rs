//! Secure-at-rest storage
//!
//! Same contract as [`FileStorage`](super::FileStorage), but every value and
//! the key index are sealed with AES-256-GCM. The key is derived once per
//! open from the passphrase with Argon2id and a per-namespace random salt.
//!
//! Layout under the root directory:
//! ```text
//! <root>/<namespace>.secure/salt              Argon2 salt
//! <root>/<namespace>.secure/<hex(key)>.enc    one sealed value per key
//! <root>/<namespace>.secure/.index.enc        sealed key index
//! ```
//!
//! Hex stems never start with a dot, so no key can address the index.
//!
//! Sealed entry format:
//! ```text
//! [Magic: 8 bytes "IDWS0001"]
//! [Version: 1 byte]
//! [Nonce: 12 bytes]
//! [Ciphertext + AEAD tag: variable]
//! ```

use super::file_storage::{read_optional, remove_optional, write_atomic};
use super::{
    index_with, key_file_stem, validate_namespace, Storage, StorageError, StorageResult,
};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, Params};
use async_trait::async_trait;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use zeroize::Zeroizing;

/// Magic header for sealed entries
const MAGIC_HEADER: &[u8; 8] = b"IDWS0001";

/// Current entry format version
const FORMAT_VERSION: u8 = 1;

/// Salt length for Argon2 KDF (16 bytes = 128 bits)
const SALT_LEN: usize = 16;

/// Nonce length for AES-GCM (12 bytes = 96 bits)
const NONCE_LEN: usize = 12;

/// Header size: magic(8) + version(1) + nonce(12) = 21 bytes
const HEADER_SIZE: usize = 8 + 1 + NONCE_LEN;

/// AES-GCM authentication tag length
const TAG_LEN: usize = 16;

/// Encrypted file storage for one namespace
pub struct SecureStorage {
    namespace: String,
    root: PathBuf,
    key: Zeroizing<Vec<u8>>,
}

impl SecureStorage {
    /// Open (or create) a sealed namespace under `root`
    pub async fn open(
        root: impl Into<PathBuf>,
        namespace: impl Into<String>,
        passphrase: &SecretString,
    ) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        let root = root.into();
        let dir = root.join(format!("{}.secure", namespace));
        fs::create_dir_all(&dir).await?;

        let salt_path = dir.join("salt");
        let salt = match read_optional(&salt_path).await? {
            Some(salt) if salt.len() == SALT_LEN => salt,
            Some(_) => {
                return Err(StorageError::Decryption(format!(
                    "salt for namespace '{}' is corrupted",
                    namespace
                )))
            }
            None => {
                let mut salt = vec![0u8; SALT_LEN];
                rand::rng().fill_bytes(&mut salt);
                write_atomic(&salt_path, &salt).await?;
                salt
            }
        };

        let passphrase = passphrase.expose_secret().to_string();
        let key = tokio::task::spawn_blocking(move || derive_key(&passphrase, &salt))
            .await
            .map_err(|e| StorageError::Other(format!("key derivation task failed: {}", e)))??;

        Ok(SecureStorage {
            namespace,
            root,
            key,
        })
    }

    fn sealed_dir(&self) -> PathBuf {
        self.root.join(format!("{}.secure", self.namespace))
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.sealed_dir().join(format!("{}.enc", key_file_stem(key)))
    }

    fn index_path(&self) -> PathBuf {
        self.sealed_dir().join(".index.enc")
    }

    fn cipher(&self) -> StorageResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StorageError::Encryption(format!("Invalid key: {}", e)))
    }

    /// Returns: [magic][version][nonce][ciphertext+tag]
    fn seal(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| StorageError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        sealed.extend_from_slice(MAGIC_HEADER);
        sealed.push(FORMAT_VERSION);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open_sealed(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        if data.len() < HEADER_SIZE + TAG_LEN {
            return Err(StorageError::Decryption("Truncated entry".to_string()));
        }
        if &data[0..8] != MAGIC_HEADER {
            return Err(StorageError::Decryption("Invalid magic header".to_string()));
        }
        if data[8] != FORMAT_VERSION {
            return Err(StorageError::Decryption(format!(
                "Unsupported version: {}",
                data[8]
            )));
        }

        let nonce = Nonce::from_slice(&data[9..HEADER_SIZE]);
        self.cipher()?
            .decrypt(nonce, &data[HEADER_SIZE..])
            .map_err(|_| StorageError::InvalidPassphrase)
    }

    async fn read_value(&self, path: &std::path::Path) -> StorageResult<Option<Value>> {
        match read_optional(path).await? {
            Some(sealed) => {
                let plaintext = Zeroizing::new(self.open_sealed(&sealed)?);
                Ok(Some(serde_json::from_slice(&plaintext)?))
            }
            None => Ok(None),
        }
    }

    async fn write_value(&self, path: &std::path::Path, value: &Value) -> StorageResult<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(value)?);
        write_atomic(path, &self.seal(&plaintext)?).await
    }

    async fn read_index(&self) -> StorageResult<Vec<String>> {
        match self.read_value(&self.index_path()).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: Vec<String>) -> StorageResult<()> {
        self.write_value(&self.index_path(), &Value::from(index)).await
    }
}

#[async_trait]
impl Storage for SecureStorage {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add(&self, key: &str, value: Value) -> StorageResult<()> {
        let index = self.read_index().await?;
        self.write_value(&self.value_path(key), &value).await?;
        self.write_index(index_with(index, key)).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self
            .read_value(&self.value_path(key))
            .await?
            .filter(|v| !v.is_null()))
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
        if index.is_empty() {
            return Ok(());
        }
        index.retain(|k| k != key);
        self.write_index(index).await
    }

    async fn update(&self, key: &str, value: Value) -> StorageResult<()> {
        self.write_value(&self.value_path(key), &value).await
    }

    async fn clear(&self) -> StorageResult<()> {
        let keys = match self.read_index().await {
            Ok(keys) => keys,
            // an unreadable index must not block a reset
            Err(_) => Vec::new(),
        };
        for key in keys {
            remove_optional(&self.value_path(&key)).await?;
        }
        remove_optional(&self.index_path()).await?;

        let mut entries = match fs::read_dir(self.sealed_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "enc") {
                remove_optional(&entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// Derive 256-bit encryption key from passphrase using Argon2id
fn derive_key(passphrase: &str, salt: &[u8]) -> StorageResult<Zeroizing<Vec<u8>>> {
    let params = Params::new(
        19 * 1024, // 19 MiB memory cost
        2,         // 2 iterations
        1,         // 1 lane
        Some(32),  // 32-byte output (256 bits for AES-256)
    )
    .map_err(|e| StorageError::Encryption(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new(vec![0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| StorageError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}
