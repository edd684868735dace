//! Onboarding state machine
//!
//! Screen selection is a pure function of the current [`AppState`] and the
//! persisted checklist flags. Flags are evaluated top to bottom and the first
//! unmet one decides the screen. Nothing here writes a flag; only a full
//! reset ever unsets one.

use serde::Serialize;

use crate::model::keys;
use crate::model::AppState;
use crate::navigation::{DidScreen, MainScreen, PinScreen, Route};
use crate::storage::{Storage, StorageExt};

/// Persisted onboarding flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingFlags {
    pub pin_set: bool,
    pub introduction_seen: bool,
    pub did_created: bool,
    pub did_confirmed: bool,
    pub tutorial_seen: bool,
}

impl OnboardingFlags {
    /// Read every flag; unreadable flags count as unset
    pub async fn load(application: &dyn Storage, secure: &dyn Storage) -> Self {
        Self {
            pin_set: secure.flag(keys::PIN).await,
            introduction_seen: application.flag(keys::INTRODUCTION).await,
            did_created: application.flag(keys::WITH_DID).await,
            did_confirmed: application.flag(keys::CONFIRMED_DID).await,
            tutorial_seen: application.flag(keys::TUTORIAL).await,
        }
    }

    /// Every gate before the main app is passed
    pub fn checklist_complete(&self) -> bool {
        self.introduction_seen && self.did_created && self.did_confirmed
    }

    /// Steady state: nothing left to show on first run
    pub fn is_terminal(&self) -> bool {
        self.pin_set && self.checklist_complete() && self.tutorial_seen
    }
}

/// Result of evaluating the state machine once
#[derive(Debug)]
pub struct Step {
    /// New application state, when it changes
    pub state: Option<AppState>,
    /// Screen to navigate to, if any
    pub route: Option<Route>,
}

/// Decide the next state and screen.
///
/// * `Starting` resolves to `Unauthenticated` when a PIN exists (the host
///   shows its authenticate overlay, no navigation) or to `NoPin` with the
///   PIN tutorial.
/// * `Authenticated` walks the checklist.
/// * `NoPin` and `Unauthenticated` wait for user input.
pub fn next_step(state: AppState, flags: &OnboardingFlags) -> Step {
    match state {
        AppState::Starting if flags.pin_set => Step {
            state: Some(AppState::Unauthenticated),
            route: None,
        },
        AppState::Starting => Step {
            state: Some(AppState::NoPin),
            route: Some(Route::PinStack {
                screen: PinScreen::TutorialPin,
            }),
        },
        AppState::Authenticated => Step {
            state: None,
            route: Some(checklist_route(flags)),
        },
        AppState::NoPin | AppState::Unauthenticated => Step {
            state: None,
            route: None,
        },
    }
}

/// Screen selection alone, for callers that do not change state
pub fn next_route(state: AppState, flags: &OnboardingFlags) -> Option<Route> {
    next_step(state, flags).route
}

fn checklist_route(flags: &OnboardingFlags) -> Route {
    if !flags.introduction_seen {
        Route::Introduction
    } else if !flags.did_created {
        Route::DidStack {
            screen: DidScreen::CreateDid,
        }
    } else if !flags.did_confirmed {
        Route::DidStack {
            screen: DidScreen::ConfirmDid,
        }
    } else {
        Route::MainStack {
            screen: MainScreen::TabStack,
            tutorial: !flags.tutorial_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;
    use serde_json::json;

    fn flags(pin: bool, intro: bool, did: bool, confirmed: bool, tutorial: bool) -> OnboardingFlags {
        OnboardingFlags {
            pin_set: pin,
            introduction_seen: intro,
            did_created: did,
            did_confirmed: confirmed,
            tutorial_seen: tutorial,
        }
    }

    #[test]
    fn test_starting_without_pin_goes_to_pin_stack() {
        let step = next_step(AppState::Starting, &OnboardingFlags::default());
        assert_eq!(step.state, Some(AppState::NoPin));
        assert_eq!(step.route.unwrap().to_string(), "PinStack/TutorialPin");
    }

    #[test]
    fn test_starting_with_pin_requires_authentication() {
        let step = next_step(AppState::Starting, &flags(true, true, true, true, true));
        assert_eq!(step.state, Some(AppState::Unauthenticated));
        assert!(step.route.is_none());
    }

    #[test]
    fn test_checklist_order() {
        let cases = [
            (flags(true, false, false, false, false), "Introduction"),
            (flags(true, true, false, false, false), "DidStack/CreateDid"),
            (flags(true, true, true, false, false), "DidStack/ConfirmDid"),
            (flags(true, true, true, true, false), "MainStack/TabStack"),
        ];
        for (flags, expected) in cases {
            let step = next_step(AppState::Authenticated, &flags);
            assert_eq!(step.state, None);
            assert_eq!(step.route.unwrap().to_string(), expected);
        }
    }

    #[test]
    fn test_tutorial_flag_is_a_parameter() {
        match next_step(AppState::Authenticated, &flags(true, true, true, true, false)).route {
            Some(Route::MainStack { tutorial, .. }) => assert!(tutorial),
            other => panic!("unexpected route {:?}", other),
        }
        match next_step(AppState::Authenticated, &flags(true, true, true, true, true)).route {
            Some(Route::MainStack { tutorial, .. }) => assert!(!tutorial),
            other => panic!("unexpected route {:?}", other),
        }
    }

    #[test]
    fn test_waiting_states_do_not_navigate() {
        for state in [AppState::NoPin, AppState::Unauthenticated] {
            let step = next_step(state, &flags(true, true, true, true, true));
            assert!(step.state.is_none());
            assert!(step.route.is_none());
        }
    }

    #[tokio::test]
    async fn test_load_reads_both_namespaces() {
        let application = MemoryStorage::new("application");
        let secure = MemoryStorage::new("application");
        secure.add(keys::PIN, json!("hash")).await.unwrap();
        application.add(keys::INTRODUCTION, json!(true)).await.unwrap();
        application.add(keys::WITH_DID, json!(false)).await.unwrap();

        let loaded = OnboardingFlags::load(&application, &secure).await;
        assert_eq!(loaded, flags(true, true, false, false, false));
        assert!(!loaded.checklist_complete());
    }

    proptest! {
        #[test]
        fn main_tab_only_when_checklist_complete(
            intro in any::<bool>(),
            did in any::<bool>(),
            confirmed in any::<bool>(),
            tutorial in any::<bool>(),
        ) {
            let f = flags(true, intro, did, confirmed, tutorial);
            let route = next_step(AppState::Authenticated, &f).route.unwrap();
            prop_assert_eq!(route.name() == "MainStack", f.checklist_complete());
        }

        #[test]
        fn pin_stack_whenever_no_pin(
            intro in any::<bool>(),
            did in any::<bool>(),
            confirmed in any::<bool>(),
        ) {
            let f = flags(false, intro, did, confirmed, false);
            let route = next_route(AppState::Starting, &f).unwrap();
            prop_assert_eq!(route.name(), "PinStack");
        }
    }
}
