//! Protocol engine boundary
//!
//! The engine owns DID management, the credential store and the WACI/OpenID
//! exchanges. The wallet drives it through [`ProtocolEngine`] and answers its
//! holder-side questions through [`CredentialApplicationHandler`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::events::AgentEvent;
use crate::model::{CredentialRecord, Did, IssuerData, VerifiableCredential};
use crate::storage::StorageError;
use crate::transport::TransportHandle;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the protocol engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    #[error("Identity operation failed: {0}")]
    Identity(String),

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The holder did not produce an answer for a credential application
    #[error("Credential application declined: {0}")]
    Declined(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Raw inbound payload: a URL, QR content or deep link, passed through as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message: Value,
}

impl InboundMessage {
    pub fn new(message: Value) -> Self {
        Self { message }
    }

    /// Wrap a scanned or deep-linked URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            message: Value::String(url.into()),
        }
    }
}

/// Issuer-proposed exchange that needs a holder decision
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialApplication {
    pub message_id: String,
    /// The protocol message as received; stored with deferred notifications
    pub message: Value,
    /// Presentation input descriptors the holder must satisfy
    pub inputs: Vec<Value>,
    pub issuer: IssuerData,
    /// Credentials the issuer offers in return, if any
    pub credentials_to_receive: Vec<CredentialRecord>,
}

/// Parameters for DID creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDidRequest {
    pub dwn_url: String,
    pub did_method: String,
    #[serde(default)]
    pub keys_to_import: Vec<Value>,
    pub prevent_credential_creation: bool,
}

/// Holder-side callback invoked by the engine during issuance
#[async_trait]
pub trait CredentialApplicationHandler: Send + Sync {
    /// Pick the credentials to present for `request`.
    ///
    /// May never complete when the exchange is deferred to a notification;
    /// engines cancel by dropping the returned future.
    async fn credential_application(
        &self,
        request: CredentialApplication,
    ) -> EngineResult<Vec<VerifiableCredential>>;
}

/// The protocol engine contract the coordinator is written against
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Load keys and protocol state
    async fn initialize(&self) -> EngineResult<()>;

    /// Parse and dispatch a raw payload; envelope detection is engine-owned
    async fn process_message(&self, message: InboundMessage) -> EngineResult<()>;

    /// Transport a message arrived on, if the engine still tracks it
    fn transport_for_message(&self, message_id: &str) -> Option<TransportHandle>;

    /// Subscribe to engine and transport events
    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;

    /// Install the holder callback used for credential applications
    fn set_holder(&self, holder: Arc<dyn CredentialApplicationHandler>);

    /// Persist a credential with its rendering hints
    async fn save_credential(&self, record: &CredentialRecord) -> EngineResult<()>;

    /// Remove a credential by id
    async fn remove_credential(&self, id: &str) -> EngineResult<()>;

    /// Every stored credential with rendering hints
    async fn credentials(&self) -> EngineResult<Vec<CredentialRecord>>;

    /// Create a DID and make it operational
    async fn create_did(&self, request: CreateDidRequest) -> EngineResult<Did>;

    /// Import keys from a plain-text export and make the DID operational
    async fn import_keys(&self, export: Value) -> EngineResult<Did>;

    /// Export keys in plain text
    async fn export_keys(&self) -> EngineResult<Value>;

    /// DID currently in use, if one exists
    fn operational_did(&self) -> Option<Did>;
}
