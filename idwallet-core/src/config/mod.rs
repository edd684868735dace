//! Configuration management for the wallet
//!
//! Defaults mirror the production agent endpoints. A TOML file can replace
//! any section, and `IDWALLET_<SECTION>_<KEY>` environment variables override
//! individual values on top of whichever source was loaded.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::model::Entity;

mod error;

pub use error::ConfigError;

/// Main wallet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Agent endpoints and DID method
    pub agent: AgentConfig,

    /// Where the plain and secure key-value stores live
    pub storage: StorageConfig,

    /// Entity directory fetch
    pub directory: DirectoryConfig,

    /// Local notification scheduling
    pub notifications: NotificationConfig,

    /// Live transport handling
    pub transport: TransportConfig,

    /// PIN policy
    pub pin: PinConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Decentralized web node used when creating a DID
    pub dwn_url: String,

    /// Universal resolver / registry endpoint
    pub universal_resolver_url: String,

    /// DID method used when the user does not pick one
    pub did_method: String,

    /// URL of the issuer/verifier directory document
    pub entities_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for the file-backed stores
    pub data_dir: PathBuf,

    /// Passphrase protecting the secure store; falls back to
    /// `IDWALLET_SECURE_PASSPHRASE` when absent
    pub secure_passphrase: Option<String>,
}

/// Entity directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Upper bound for the startup fetch
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Entities shown when the directory cannot be fetched
    pub initial_entities: Vec<Entity>,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Delay between recording a notification and surfacing it locally
    #[serde(with = "humantime_serde")]
    pub schedule_delay: Duration,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Grace period before a live transport is disposed after a credential
    /// arrives, so in-flight acknowledgements can drain
    #[serde(with = "humantime_serde")]
    pub dispose_delay: Duration,
}

/// PIN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Number of digits a PIN must have
    pub length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dwn_url: "https://dwn-ssi.buenosaires.gob.ar/".to_string(),
            universal_resolver_url: "https://node-ssi.buenosaires.gob.ar".to_string(),
            did_method: "did:quarkid:zksync".to_string(),
            entities_url: "https://quarkid.org/.well-known/did.json".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            secure_passphrase: None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            initial_entities: Vec::new(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            schedule_delay: Duration::from_secs(2),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dispose_delay: Duration::from_secs(3),
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self { length: 8 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

fn parse_env_duration(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(raw) => humantime_serde::re::humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl WalletConfig {
    /// Load configuration from defaults plus environment overrides
    ///
    /// Example: `IDWALLET_AGENT_ENTITIES_URL=https://example.org/did.json`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `IDWALLET_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("IDWALLET_AGENT_DWN_URL") {
            self.agent.dwn_url = url;
        }
        if let Ok(url) = env::var("IDWALLET_AGENT_RESOLVER_URL") {
            self.agent.universal_resolver_url = url;
        }
        if let Ok(method) = env::var("IDWALLET_AGENT_DID_METHOD") {
            self.agent.did_method = method;
        }
        if let Ok(url) = env::var("IDWALLET_AGENT_ENTITIES_URL") {
            self.agent.entities_url = url;
        }

        if let Ok(data_dir) = env::var("IDWALLET_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(passphrase) = env::var("IDWALLET_SECURE_PASSPHRASE") {
            self.storage.secure_passphrase = Some(passphrase);
        }

        if let Some(timeout) = parse_env_duration("IDWALLET_DIRECTORY_TIMEOUT")? {
            self.directory.request_timeout = timeout;
        }
        if let Some(delay) = parse_env_duration("IDWALLET_NOTIFICATIONS_DELAY")? {
            self.notifications.schedule_delay = delay;
        }
        if let Some(delay) = parse_env_duration("IDWALLET_TRANSPORT_DISPOSE_DELAY")? {
            self.transport.dispose_delay = delay;
        }
        if let Some(length) = parse_env::<usize>("IDWALLET_PIN_LENGTH")? {
            self.pin.length = length;
        }

        if let Ok(level) = env::var("IDWALLET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env::<bool>("IDWALLET_LOG_JSON")? {
            self.logging.json_format = json;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("agent.dwn_url", &self.agent.dwn_url),
            ("agent.universal_resolver_url", &self.agent.universal_resolver_url),
            ("agent.entities_url", &self.agent.entities_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                ConfigError::ValidationFailed(format!("{} is not a valid URL: {}", name, e))
            })?;
        }

        if !self.agent.did_method.starts_with("did:") {
            return Err(ConfigError::ValidationFailed(format!(
                "did_method must start with 'did:', got '{}'",
                self.agent.did_method
            )));
        }

        if self.pin.length < 4 {
            return Err(ConfigError::ValidationFailed(
                "pin.length must be at least 4".to_string(),
            ));
        }

        if self.directory.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "directory.request_timeout must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WalletConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pin.length, 8);
        assert_eq!(config.notifications.schedule_delay, Duration::from_secs(2));
        assert_eq!(config.transport.dispose_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_config_validation() {
        let mut config = WalletConfig::default();
        config.pin.length = 2;
        assert!(config.validate().is_err());

        config = WalletConfig::default();
        config.agent.entities_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config = WalletConfig::default();
        config.agent.did_method = "quarkid".to_string();
        assert!(config.validate().is_err());

        config = WalletConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.toml");

        std::fs::write(
            &path,
            "[transport]\ndispose_delay = \"5s\"\n\n[pin]\nlength = 6\n",
        )
        .unwrap();

        let config = WalletConfig::from_file(&path).unwrap();
        assert_eq!(config.transport.dispose_delay, Duration::from_secs(5));
        assert_eq!(config.pin.length, 6);
        assert_eq!(config.agent.did_method, "did:quarkid:zksync");

        assert!(matches!(
            WalletConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));

        let saved = dir.path().join("saved.toml");
        config.save_to_file(&saved).unwrap();
        let reloaded = WalletConfig::from_file(&saved).unwrap();
        assert_eq!(reloaded.pin.length, 6);
    }
}
