//! Protocol engine events
//!
//! Events raised by the protocol engine and its transports, consumed by the
//! session coordinator.

use serde::{Deserialize, Serialize};

use crate::model::{CredentialRecord, Did, IssuerData};
use crate::transport::TransportHandle;

mod broadcaster;

pub use broadcaster::EventBroadcaster;

/// Credentials issued to the holder at the end of an issuance exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialArrival {
    pub credentials: Vec<CredentialRecord>,
    pub issuer: IssuerData,
    pub message_id: String,
}

/// Outcome of a presentation: a verifier acknowledgement or a problem report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Present on success, e.g. `OK`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub message_id: String,
    /// Problem code, present on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Acknowledgement {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            status: Some("OK".to_string()),
            message_id: message_id.into(),
            code: None,
        }
    }

    pub fn problem(message_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status: None,
            message_id: message_id.into(),
            code: Some(code.into()),
        }
    }
}

/// Event emitted by the protocol engine
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Identity layer finished loading; query the engine for an operational DID
    IdentityInitialized,

    /// A new operational DID is in use
    OperationalDidChanged(Did),

    /// A DID was created by the engine
    DidCreated(Did),

    /// Issued credentials arrived
    CredentialArrived(CredentialArrival),

    /// Verifier acknowledged a presentation
    AckCompleted(Acknowledgement),

    /// Counterparty reported a problem
    ProblemReport(Acknowledgement),

    /// A connectable transport opened
    TransportConnected(TransportHandle),

    /// A connectable transport closed
    TransportDisconnected(TransportHandle),
}

impl AgentEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::IdentityInitialized => "identity_initialized",
            AgentEvent::OperationalDidChanged(_) => "operational_did_changed",
            AgentEvent::DidCreated(_) => "did_created",
            AgentEvent::CredentialArrived(_) => "credential_arrived",
            AgentEvent::AckCompleted(_) => "ack_completed",
            AgentEvent::ProblemReport(_) => "problem_report",
            AgentEvent::TransportConnected(_) => "transport_connected",
            AgentEvent::TransportDisconnected(_) => "transport_disconnected",
        }
    }

    /// Whether this event belongs to an active holder session, as opposed to
    /// identity lifecycle
    pub fn is_session_event(&self) -> bool {
        matches!(
            self,
            AgentEvent::CredentialArrived(_)
                | AgentEvent::AckCompleted(_)
                | AgentEvent::ProblemReport(_)
                | AgentEvent::TransportConnected(_)
                | AgentEvent::TransportDisconnected(_)
        )
    }
}
