//! Application state shared by the coordinator and its observers

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CredentialRecord, Entity, NotificationRecord};

/// Which root screen stack is reachable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    #[default]
    Starting,
    NoPin,
    Unauthenticated,
    Authenticated,
}

impl AppState {
    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// The state only advances, except for the lock/unlock toggle between
    /// `Unauthenticated` and `Authenticated`.
    pub fn can_transition_to(self, next: AppState) -> bool {
        use AppState::{Authenticated, NoPin, Starting, Unauthenticated};
        matches!(
            (self, next),
            (Starting, NoPin)
                | (Starting, Unauthenticated)
                | (NoPin, Authenticated)
                | (Unauthenticated, Authenticated)
                | (Authenticated, Unauthenticated)
        ) || self == next
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Starting => "STARTING",
            AppState::NoPin => "NO_PIN",
            AppState::Unauthenticated => "UNAUTHENTICATED",
            AppState::Authenticated => "AUTHENTICATED",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the UI layer renders from.
///
/// Observers only ever see clones of this value; the coordinator is the sole
/// mutator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationState {
    pub state: AppState,
    pub is_connected: bool,
    pub is_loading: bool,
    pub credentials: Vec<CredentialRecord>,
    pub notifications: Vec<NotificationRecord>,
    pub entities: Vec<Entity>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self {
            state: AppState::Starting,
            is_connected: false,
            is_loading: true,
            credentials: Vec::new(),
            notifications: Vec::new(),
            entities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(AppState::Starting.can_transition_to(AppState::NoPin));
        assert!(AppState::Starting.can_transition_to(AppState::Unauthenticated));
        assert!(AppState::NoPin.can_transition_to(AppState::Authenticated));
        assert!(AppState::Unauthenticated.can_transition_to(AppState::Authenticated));
        assert!(AppState::Authenticated.can_transition_to(AppState::Unauthenticated));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!AppState::Authenticated.can_transition_to(AppState::Starting));
        assert!(!AppState::Authenticated.can_transition_to(AppState::NoPin));
        assert!(!AppState::Starting.can_transition_to(AppState::Authenticated));
        assert!(!AppState::Unauthenticated.can_transition_to(AppState::NoPin));
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = ApplicationState::default();
        assert_eq!(state.state, AppState::Starting);
        assert!(state.is_loading);
        assert!(!state.is_connected);
    }
}
