//! Test doubles for the coordinator's collaborators

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

use super::fixtures;
use crate::coordinator::Restarter;
use crate::directory::{DirectoryError, DirectoryResult, EntitySource};
use crate::engine::{
    CreateDidRequest, CredentialApplicationHandler, EngineError, EngineResult, InboundMessage,
    ProtocolEngine,
};
use crate::events::{AgentEvent, EventBroadcaster};
use crate::model::{CredentialRecord, Did, Entity};
use crate::navigation::{Navigator, Route};
use crate::notifications::{NotificationScheduler, ScheduledNotification};
use crate::storage::{Storage, StorageError, StorageResult};
use crate::transport::{Transport, TransportHandle};

/// Transport that counts how often it was disposed
pub struct MockTransport {
    id: String,
    connectable: bool,
    disposed: AtomicUsize,
}

impl MockTransport {
    /// A websocket-like session
    pub fn connectable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            connectable: true,
            disposed: AtomicUsize::new(0),
        }
    }

    /// A deep link, QR or relay delivery
    pub fn oneshot(id: &str) -> Self {
        Self {
            id: id.to_string(),
            connectable: false,
            disposed: AtomicUsize::new(0),
        }
    }

    pub fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("id", &self.id)
            .field("connectable", &self.connectable)
            .finish()
    }
}

impl Transport for MockTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_connectable(&self) -> bool {
        self.connectable
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scriptable protocol engine
pub struct MockEngine {
    events: EventBroadcaster,
    transports: Mutex<HashMap<String, TransportHandle>>,
    holder: Mutex<Option<Arc<dyn CredentialApplicationHandler>>>,
    credentials: Mutex<Vec<CredentialRecord>>,
    did: Mutex<Option<Did>>,
    processed: Mutex<Vec<InboundMessage>>,
    fail_identity: AtomicBool,
    fail_initialize: AtomicBool,
    ask_holder: AtomicBool,
    initialized: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            events: EventBroadcaster::default(),
            transports: Mutex::new(HashMap::new()),
            holder: Mutex::new(None),
            credentials: Mutex::new(Vec::new()),
            did: Mutex::new(None),
            processed: Mutex::new(Vec::new()),
            fail_identity: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
            ask_holder: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        }
    }

    /// Engine that already has an operational DID
    pub fn with_did(did: &str) -> Self {
        let engine = Self::new();
        *engine.did.lock().unwrap() = Some(Did::new(did));
        engine
    }

    /// Report `transport` as the channel `message_id` arrived on
    pub fn route(&self, message_id: &str, transport: TransportHandle) {
        self.transports
            .lock()
            .unwrap()
            .insert(message_id.to_string(), transport);
    }

    pub fn emit(&self, event: AgentEvent) -> usize {
        self.events.emit(event)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Make DID creation and import fail
    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::SeqCst);
    }

    /// Make `initialize` fail
    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// Run every processed message through the holder like a real agent:
    /// a presentation request keyed by the message's `id`, awaited to the end
    pub fn ask_holder(&self, ask: bool) {
        self.ask_holder.store(ask, Ordering::SeqCst);
    }

    pub fn holder(&self) -> Option<Arc<dyn CredentialApplicationHandler>> {
        self.holder.lock().unwrap().clone()
    }

    pub fn processed(&self) -> Vec<InboundMessage> {
        self.processed.lock().unwrap().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn stored_credentials(&self) -> Vec<CredentialRecord> {
        self.credentials.lock().unwrap().clone()
    }

    fn adopt(&self, did: Did) -> Did {
        *self.did.lock().unwrap() = Some(did.clone());
        self.events.emit(AgentEvent::DidCreated(did.clone()));
        self.events.emit(AgentEvent::OperationalDidChanged(did.clone()));
        did
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolEngine for MockEngine {
    async fn initialize(&self) -> EngineResult<()> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(EngineError::Storage(StorageError::Other(
                "agent keystore locked".to_string(),
            )));
        }
        self.initialized.store(true, Ordering::SeqCst);
        self.events.emit(AgentEvent::IdentityInitialized);
        Ok(())
    }

    async fn process_message(&self, message: InboundMessage) -> EngineResult<()> {
        let message_id = message.message.get("id").and_then(Value::as_str).map(str::to_string);
        let count = {
            let mut processed = self.processed.lock().unwrap();
            processed.push(message);
            processed.len()
        };
        if !self.ask_holder.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(holder) = self.holder() {
            let message_id = message_id.unwrap_or_else(|| format!("inbound-{}", count));
            holder
                .credential_application(fixtures::application(&message_id, false))
                .await?;
        }
        Ok(())
    }

    fn transport_for_message(&self, message_id: &str) -> Option<TransportHandle> {
        self.transports.lock().unwrap().get(message_id).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    fn set_holder(&self, holder: Arc<dyn CredentialApplicationHandler>) {
        *self.holder.lock().unwrap() = Some(holder);
    }

    async fn save_credential(&self, record: &CredentialRecord) -> EngineResult<()> {
        self.credentials.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn remove_credential(&self, id: &str) -> EngineResult<()> {
        self.credentials
            .lock()
            .unwrap()
            .retain(|c| c.id() != Some(id));
        Ok(())
    }

    async fn credentials(&self) -> EngineResult<Vec<CredentialRecord>> {
        Ok(self.stored_credentials())
    }

    async fn create_did(&self, request: CreateDidRequest) -> EngineResult<Did> {
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(EngineError::Identity("registry unreachable".to_string()));
        }
        Ok(self.adopt(Did::new(format!("{}:EiTest", request.did_method))))
    }

    async fn import_keys(&self, export: Value) -> EngineResult<Did> {
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(EngineError::Identity("bad export".to_string()));
        }
        let did = export
            .get("did")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Identity("export has no did".to_string()))?;
        Ok(self.adopt(Did::new(did)))
    }

    async fn export_keys(&self) -> EngineResult<Value> {
        match self.operational_did() {
            Some(did) => Ok(json!({ "did": did.as_str(), "keys": [] })),
            None => Err(EngineError::Identity("no operational DID".to_string())),
        }
    }

    fn operational_did(&self) -> Option<Did> {
        self.did.lock().unwrap().clone()
    }
}

/// Navigator that records every route
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    arrived: Notify,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Name/Screen` of every route so far
    pub fn paths(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    pub fn last_path(&self) -> Option<String> {
        self.paths().pop()
    }

    /// Remove and return recorded routes
    pub fn take(&self) -> Vec<Route> {
        std::mem::take(&mut *self.routes.lock().unwrap())
    }

    /// Wait for the oldest unconsumed route and remove it
    pub async fn next_route(&self) -> Route {
        loop {
            {
                let mut routes = self.routes.lock().unwrap();
                if !routes.is_empty() {
                    return routes.remove(0);
                }
            }
            self.arrived.notified().await;
        }
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
        self.arrived.notify_one();
    }
}

/// Scheduler that records instead of waiting
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(ScheduledNotification, Duration)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<(ScheduledNotification, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl NotificationScheduler for RecordingScheduler {
    fn schedule(&self, notification: ScheduledNotification, delay: Duration) {
        self.scheduled.lock().unwrap().push((notification, delay));
    }
}

/// Restarter that counts restarts
#[derive(Default)]
pub struct MockRestarter {
    restarts: AtomicUsize,
}

impl MockRestarter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl Restarter for MockRestarter {
    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Directory with a fixed answer
pub struct StaticDirectory {
    entities: Option<Vec<Entity>>,
}

impl StaticDirectory {
    pub fn with(entities: Vec<Entity>) -> Self {
        Self {
            entities: Some(entities),
        }
    }

    /// Every fetch fails
    pub fn failing() -> Self {
        Self { entities: None }
    }
}

#[async_trait]
impl EntitySource for StaticDirectory {
    async fn fetch(&self) -> DirectoryResult<Vec<Entity>> {
        self.entities
            .clone()
            .ok_or_else(|| DirectoryError::Network("connection refused".to_string()))
    }
}

/// Storage where every operation fails
pub struct FailingStorage {
    namespace: String,
}

impl FailingStorage {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    fn error(&self) -> StorageError {
        StorageError::Other(format!("namespace '{}' is unavailable", self.namespace))
    }
}

#[async_trait]
impl Storage for FailingStorage {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn add(&self, _key: &str, _value: Value) -> StorageResult<()> {
        Err(self.error())
    }

    async fn get(&self, _key: &str) -> StorageResult<Option<Value>> {
        Err(self.error())
    }

    async fn get_all(&self) -> StorageResult<HashMap<String, Value>> {
        Err(self.error())
    }

    async fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(self.error())
    }

    async fn update(&self, _key: &str, _value: Value) -> StorageResult<()> {
        Err(self.error())
    }

    async fn clear(&self) -> StorageResult<()> {
        Err(self.error())
    }
}
