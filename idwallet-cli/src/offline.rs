//! Host-side stand-ins used by the command line tool
//!
//! The CLI inspects and maintains wallet storage; it never runs protocol
//! exchanges, so the engine it hands the coordinator only tracks what the
//! coordinator itself asks of it.

use async_trait::async_trait;
use idwallet_core::engine::{
    CreateDidRequest, CredentialApplicationHandler, EngineError, EngineResult,
};
use idwallet_core::events::{AgentEvent, EventBroadcaster};
use idwallet_core::model::{CredentialRecord, Did};
use idwallet_core::transport::TransportHandle;
use idwallet_core::{InboundMessage, Navigator, ProtocolEngine, Restarter, Route};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Engine without network access
#[derive(Default)]
pub struct OfflineEngine {
    events: EventBroadcaster,
}

impl OfflineEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn offline(operation: &str) -> EngineError {
    EngineError::UnsupportedMessage(format!("{} needs a connected agent", operation))
}

#[async_trait]
impl ProtocolEngine for OfflineEngine {
    async fn initialize(&self) -> EngineResult<()> {
        self.events.emit(AgentEvent::IdentityInitialized);
        Ok(())
    }

    async fn process_message(&self, _message: InboundMessage) -> EngineResult<()> {
        Err(offline("processing a message"))
    }

    fn transport_for_message(&self, _message_id: &str) -> Option<TransportHandle> {
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    fn set_holder(&self, _holder: Arc<dyn CredentialApplicationHandler>) {}

    async fn save_credential(&self, _record: &CredentialRecord) -> EngineResult<()> {
        Err(offline("saving a credential"))
    }

    async fn remove_credential(&self, _id: &str) -> EngineResult<()> {
        Err(offline("removing a credential"))
    }

    async fn credentials(&self) -> EngineResult<Vec<CredentialRecord>> {
        Ok(Vec::new())
    }

    async fn create_did(&self, _request: CreateDidRequest) -> EngineResult<Did> {
        Err(offline("creating a DID"))
    }

    async fn import_keys(&self, _export: Value) -> EngineResult<Did> {
        Err(offline("importing keys"))
    }

    async fn export_keys(&self) -> EngineResult<Value> {
        Err(offline("exporting keys"))
    }

    fn operational_did(&self) -> Option<Did> {
        None
    }
}

/// Prints where the wallet would navigate
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        println!("-> {}", route);
    }
}

/// A CLI process has nothing to reload; the next invocation starts fresh
pub struct LogRestarter;

impl Restarter for LogRestarter {
    fn restart(&self) {
        info!("wallet reset, next run starts from a clean install");
    }
}
