//! The wallet's storage namespaces

use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

use crate::config::StorageConfig;
use crate::model::keys;
use crate::storage::{FileStorage, MemoryStorage, SecureStorage, Storage, StorageResult};

/// Namespaces the coordinator reads and clears.
///
/// Engine-owned namespaces (`agent`, `vc`, `waci`, `openid`) are opened by
/// the engine itself.
#[derive(Clone)]
pub struct WalletStores {
    /// Notifications, seen-message ids and onboarding flags
    pub application: Arc<dyn Storage>,
    /// PIN hash
    pub application_secure: Arc<dyn Storage>,
    /// Engine key material
    pub agent_secure: Arc<dyn Storage>,
}

impl WalletStores {
    /// Open file-backed stores under `config.data_dir`
    pub async fn open(config: &StorageConfig, passphrase: &SecretString) -> StorageResult<Self> {
        let root = &config.data_dir;
        let application = FileStorage::open(root, keys::APPLICATION_NAMESPACE).await?;
        let application_secure =
            SecureStorage::open(root, keys::APPLICATION_NAMESPACE, passphrase).await?;
        let agent_secure = SecureStorage::open(root, keys::AGENT_NAMESPACE, passphrase).await?;

        info!(data_dir = %root.display(), "wallet stores opened");
        Ok(Self {
            application: Arc::new(application),
            application_secure: Arc::new(application_secure),
            agent_secure: Arc::new(agent_secure),
        })
    }

    /// Volatile stores, for tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            application: Arc::new(MemoryStorage::new(keys::APPLICATION_NAMESPACE)),
            application_secure: Arc::new(MemoryStorage::new(keys::APPLICATION_NAMESPACE)),
            agent_secure: Arc::new(MemoryStorage::new(keys::AGENT_NAMESPACE)),
        }
    }
}
