//! Top-level wallet error

use thiserror::Error;

use crate::config::ConfigError;
use crate::directory::DirectoryError;
use crate::engine::EngineError;
use crate::model::AppState;
use crate::notifications::NotificationError;
use crate::pin::PinError;
use crate::storage::StorageError;

/// Errors surfaced by the session coordinator
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet already initialized")]
    AlreadyInitialized,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: AppState, to: AppState },

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Invalid PIN")]
    InvalidPin,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Pin(#[from] PinError),
}

impl From<NotificationError> for WalletError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => WalletError::NotificationNotFound(id),
            NotificationError::Storage(e) => WalletError::Storage(e),
        }
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_errors_flatten() {
        let err: WalletError = NotificationError::NotFound("n1".to_string()).into();
        assert!(matches!(err, WalletError::NotificationNotFound(ref id) if id == "n1"));
        assert_eq!(err.to_string(), "Notification not found: n1");
    }

    #[test]
    fn test_transition_message() {
        let err = WalletError::InvalidTransition {
            from: AppState::Authenticated,
            to: AppState::NoPin,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from AUTHENTICATED to NO_PIN"
        );
    }
}
