//! Navigation targets
//!
//! The coordinator does not render anything. It tells the host where to go
//! by handing a typed [`Route`] to a [`Navigator`].

use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

use crate::model::{CredentialRecord, IssuerData, VerifiableCredential};

/// Screens inside the PIN stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinScreen {
    TutorialPin,
}

/// Screens inside the DID stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidScreen {
    CreateDid,
    ConfirmDid,
}

/// Screens inside the main stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainScreen {
    TabStack,
}

/// Channel through which the credential-selection screen answers the engine
pub struct SelectionResponder {
    tx: oneshot::Sender<Vec<VerifiableCredential>>,
}

impl SelectionResponder {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Vec<VerifiableCredential>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Submit the user's selection. Returns false when nobody is waiting any
    /// more.
    pub fn respond(self, credentials: Vec<VerifiableCredential>) -> bool {
        self.tx.send(credentials).is_ok()
    }

    /// Whether the waiting side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for SelectionResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionResponder")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// A navigation request
#[derive(Debug)]
pub enum Route {
    PinStack {
        screen: PinScreen,
    },
    Introduction,
    DidStack {
        screen: DidScreen,
    },
    MainStack {
        screen: MainScreen,
        /// Whether the tab stack should open the tutorial overlay
        tutorial: bool,
    },
    AcceptCredentials {
        credentials: Vec<CredentialRecord>,
        issuer: IssuerData,
    },
    VerificationResult {
        status: Option<String>,
        code: Option<String>,
    },
    PresentCredentials {
        inputs: Vec<Value>,
        issuer: IssuerData,
        credentials_to_receive: Vec<CredentialRecord>,
        responder: SelectionResponder,
    },
}

impl Route {
    /// Root route name, as registered in the host's navigator
    pub fn name(&self) -> &'static str {
        match self {
            Route::PinStack { .. } => "PinStack",
            Route::Introduction => "Introduction",
            Route::DidStack { .. } => "DidStack",
            Route::MainStack { .. } => "MainStack",
            Route::AcceptCredentials { .. } => "AcceptCredentials",
            Route::VerificationResult { .. } => "VerificationResult",
            Route::PresentCredentials { .. } => "PresentCredentials",
        }
    }

    /// Nested screen name for stack routes
    pub fn screen(&self) -> Option<&'static str> {
        match self {
            Route::PinStack {
                screen: PinScreen::TutorialPin,
            } => Some("TutorialPin"),
            Route::DidStack {
                screen: DidScreen::CreateDid,
            } => Some("CreateDid"),
            Route::DidStack {
                screen: DidScreen::ConfirmDid,
            } => Some("ConfirmDid"),
            Route::MainStack {
                screen: MainScreen::TabStack,
                ..
            } => Some("TabStack"),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.screen() {
            Some(screen) => write!(f, "{}/{}", self.name(), screen),
            None => f.write_str(self.name()),
        }
    }
}

/// Navigation handle supplied by the host at initialization
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_display() {
        let route = Route::PinStack {
            screen: PinScreen::TutorialPin,
        };
        assert_eq!(route.to_string(), "PinStack/TutorialPin");
        assert_eq!(Route::Introduction.to_string(), "Introduction");
    }

    #[tokio::test]
    async fn test_selection_responder() {
        let (responder, rx) = SelectionResponder::new();
        assert!(!responder.is_closed());
        assert!(responder.respond(vec![]));
        assert_eq!(rx.await.unwrap(), vec![]);

        let (responder, rx) = SelectionResponder::new();
        drop(rx);
        assert!(responder.is_closed());
        assert!(!responder.respond(vec![]));
    }
}
