//! PIN management
//!
//! The PIN is never stored as entered. [`PinManager::set`] keeps an Argon2id
//! PHC string in the secure application namespace and
//! [`PinManager::validate`] verifies against it.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::keys;
use crate::storage::{Storage, StorageError};

/// PIN errors
#[derive(Debug, Error)]
pub enum PinError {
    #[error("PIN must be exactly {expected} digits")]
    InvalidFormat { expected: usize },

    #[error("PIN hashing failed: {0}")]
    Hash(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type PinResult<T> = Result<T, PinError>;

/// Check that `pin` is exactly `length` ASCII digits
pub fn check_format(pin: &str, length: usize) -> PinResult<()> {
    if pin.len() == length && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PinError::InvalidFormat { expected: length })
    }
}

/// Hash a PIN into a PHC string
pub fn hash_pin(pin: &str) -> PinResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PinError::Hash(e.to_string()))?;

    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PinError::Hash(e.to_string()))
}

/// Verify a PIN against a stored PHC string. Malformed hashes never match.
pub fn verify_pin(pin: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored PIN hash is malformed");
            false
        }
    }
}

/// Stores and checks the wallet PIN
#[derive(Clone)]
pub struct PinManager {
    storage: Arc<dyn Storage>,
    length: usize,
}

impl PinManager {
    /// `storage` must be the secure application namespace
    pub fn new(storage: Arc<dyn Storage>, length: usize) -> Self {
        Self { storage, length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Whether a PIN has been set
    pub async fn is_set(&self) -> bool {
        matches!(self.storage.get(keys::PIN).await, Ok(Some(_)))
    }

    /// Hash and store a new PIN, replacing any previous one
    pub async fn set(&self, pin: &SecretString) -> PinResult<()> {
        let pin = pin.expose_secret().to_string();
        check_format(&pin, self.length)?;

        let hash = tokio::task::spawn_blocking(move || hash_pin(&pin))
            .await
            .map_err(|e| PinError::Hash(format!("hashing task failed: {}", e)))??;

        self.storage.add(keys::PIN, Value::String(hash)).await?;
        debug!("PIN stored");
        Ok(())
    }

    /// Compare `pin` with the stored one. Returns false when no PIN is set.
    pub async fn validate(&self, pin: &SecretString) -> PinResult<bool> {
        let stored = match self.storage.get(keys::PIN).await? {
            Some(Value::String(stored)) => stored,
            Some(_) => {
                warn!("stored PIN has an unexpected shape");
                return Ok(false);
            }
            None => return Ok(false),
        };

        let pin = pin.expose_secret().to_string();
        tokio::task::spawn_blocking(move || verify_pin(&pin, &stored))
            .await
            .map_err(|e| PinError::Hash(format!("verification task failed: {}", e)))
    }
}
