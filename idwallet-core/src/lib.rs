//! Session and state coordination for a decentralized-identity wallet
//!
//! The [`SessionCoordinator`] reconciles protocol engine events with
//! navigation and persisted wallet state: it decides whether an exchange is
//! shown live or deferred to a notification, deduplicates redelivered
//! messages and drives onboarding from PIN setup to the main screen.

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod navigation;
pub mod notifications;
pub mod onboarding;
pub mod pin;
pub mod storage;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::WalletConfig;
pub use coordinator::{EventSubscription, Restarter, SessionCoordinator, StateSubscription, WalletStores};
pub use engine::{InboundMessage, ProtocolEngine};
pub use error::{WalletError, WalletResult};
pub use logging::{init_logging, LogLevel};
pub use model::{AppState, ApplicationState};
pub use navigation::{Navigator, Route};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = LogLevel::Info;
        let _ = AppState::Starting;
        let _ = WalletConfig::default();
    }
}
