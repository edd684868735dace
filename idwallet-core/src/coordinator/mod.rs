//! Session coordinator
//!
//! [`SessionCoordinator`] is the single mutator of [`ApplicationState`]. It
//! reduces protocol engine events and user commands into state, persists
//! notification and onboarding records, and tells the host where to navigate.
//!
//! Observers never touch the state directly: they take a
//! [`snapshot`](SessionCoordinator::snapshot) or hold a [`StateSubscription`].
//!
//! Typical host wiring:
//!
//! ```ignore
//! let coordinator = SessionCoordinator::builder(engine, stores, restarter)
//!     .config(config)
//!     .build()?;
//! let _events = coordinator.attach_listeners();
//! coordinator.initialize(navigator).await?;
//! ```

use secrecy::SecretString;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::WalletConfig;
use crate::directory::{load_entities, EntitySource, HttpDirectory};
use crate::engine::{CreateDidRequest, InboundMessage, ProtocolEngine};
use crate::error::{WalletError, WalletResult};
use crate::metrics::Timer;
use crate::model::keys;
use crate::model::{
    AppState, ApplicationState, CredentialRecord, Did, NotificationRecord, NotificationType,
};
use crate::navigation::{Navigator, Route};
use crate::notifications::{NotificationCenter, NotificationScheduler, TimerScheduler};
use crate::onboarding::{next_step, OnboardingFlags};
use crate::pin::PinManager;
use crate::storage::Storage;
use crate::transport::TransportHandle;

mod exchange;
mod listeners;
mod stores;

pub use listeners::EventSubscription;
pub use stores::WalletStores;

/// Restarts the host process after a reset
pub trait Restarter: Send + Sync {
    fn restart(&self);
}

/// Read-only view of the application state with change notification
pub struct StateSubscription {
    rx: watch::Receiver<ApplicationState>,
}

impl StateSubscription {
    /// State as of now
    pub fn current(&self) -> ApplicationState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<ApplicationState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Builder for [`SessionCoordinator`]
pub struct CoordinatorBuilder {
    engine: Arc<dyn ProtocolEngine>,
    stores: WalletStores,
    restarter: Arc<dyn Restarter>,
    config: WalletConfig,
    directory: Option<Arc<dyn EntitySource>>,
    scheduler: Option<Arc<dyn NotificationScheduler>>,
}

impl CoordinatorBuilder {
    pub fn config(mut self, config: WalletConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the entity directory source (defaults to HTTP)
    pub fn directory(mut self, directory: Arc<dyn EntitySource>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Override the local notification scheduler (defaults to tokio timers)
    pub fn scheduler(mut self, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> WalletResult<Arc<SessionCoordinator>> {
        let directory = match self.directory {
            Some(directory) => directory,
            None => Arc::new(HttpDirectory::from_config(&self.config)?),
        };
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TimerScheduler::new()));

        let (state, _) = watch::channel(ApplicationState::default());
        let state = Arc::new(state);

        let notifications = NotificationCenter::new(
            self.stores.application.clone(),
            scheduler,
            state.clone(),
            self.config.notifications.schedule_delay,
        );
        let pins = PinManager::new(self.stores.application_secure.clone(), self.config.pin.length);

        Ok(Arc::new(SessionCoordinator {
            engine: self.engine,
            stores: self.stores,
            restarter: self.restarter,
            directory,
            config: self.config,
            state,
            notifications,
            pins,
            navigator: OnceLock::new(),
            initializing: AtomicBool::new(false),
            live_transport: Mutex::new(None),
            session_active: AtomicBool::new(false),
            pending_link: Mutex::new(None),
        }))
    }
}

/// The wallet's session and state coordinator
pub struct SessionCoordinator {
    engine: Arc<dyn ProtocolEngine>,
    stores: WalletStores,
    restarter: Arc<dyn Restarter>,
    directory: Arc<dyn EntitySource>,
    config: WalletConfig,
    state: Arc<watch::Sender<ApplicationState>>,
    notifications: NotificationCenter,
    pins: PinManager,
    navigator: OnceLock<Arc<dyn Navigator>>,
    /// Held from the start of `initialize`; released if it fails
    initializing: AtomicBool,
    /// Last transport reported connected, closed by `close_connection`
    live_transport: Mutex<Option<TransportHandle>>,
    session_active: AtomicBool,
    /// Deep link received before session events were enabled
    pending_link: Mutex<Option<InboundMessage>>,
}

impl SessionCoordinator {
    pub fn builder(
        engine: Arc<dyn ProtocolEngine>,
        stores: WalletStores,
        restarter: Arc<dyn Restarter>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            engine,
            stores,
            restarter,
            config: WalletConfig::default(),
            directory: None,
            scheduler: None,
        }
    }

    /// Load persisted data, start the engine and pick the first screen.
    ///
    /// May run once per coordinator; a second call returns
    /// [`WalletError::AlreadyInitialized`]. If the engine fails to start,
    /// nothing is committed and the call may be retried.
    pub async fn initialize(self: &Arc<Self>, navigator: Arc<dyn Navigator>) -> WalletResult<()> {
        if self.initializing.swap(true, Ordering::AcqRel) {
            return Err(WalletError::AlreadyInitialized);
        }

        let timer = Timer::new("wallet.initialize.duration_ms");
        let loaded = self.notifications.load().await;
        let entities = load_entities(
            self.directory.as_ref(),
            &self.config.directory.initial_entities,
        )
        .await;

        if let Err(e) = self.engine.initialize().await {
            error!(error = %e, "engine failed to start");
            self.initializing.store(false, Ordering::Release);
            return Err(e.into());
        }
        self.navigator
            .set(navigator)
            .map_err(|_| WalletError::AlreadyInitialized)?;
        self.engine
            .set_holder(Arc::new(exchange::HolderBridge::new(Arc::downgrade(self))));

        self.state.send_modify(|state| {
            state.entities = entities;
            state.is_loading = false;
        });
        timer.stop();
        info!(notifications = loaded, "wallet initialized");

        self.update_available_screen().await
    }

    /// Current state
    pub fn snapshot(&self) -> ApplicationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            rx: self.state.subscribe(),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn set_is_connected(&self, is_connected: bool) {
        self.state
            .send_if_modified(|state| replace(&mut state.is_connected, is_connected));
    }

    pub fn set_is_loading(&self, is_loading: bool) {
        self.state
            .send_if_modified(|state| replace(&mut state.is_loading, is_loading));
    }

    /// Hand a raw payload to the engine unchanged
    pub async fn process_message(&self, message: InboundMessage) -> WalletResult<()> {
        self.engine.process_message(message).await?;
        Ok(())
    }

    /// Hand `message` to the engine on a task of its own.
    ///
    /// Processing can park on the holder until the user answers, or forever
    /// for a deferred exchange, so event handlers never await it.
    pub(crate) fn spawn_message(&self, message: InboundMessage) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.process_message(message).await {
                warn!(error = %e, "inbound message could not be processed");
            }
        });
    }

    /// Process a deep link now, or once session events are enabled
    pub async fn open_link(&self, message: InboundMessage) -> WalletResult<()> {
        if self.session_active.load(Ordering::Acquire) {
            return self.process_message(message).await;
        }
        debug!("session not active yet, deferring link");
        *lock(&self.pending_link) = Some(message);
        Ok(())
    }

    // ---- onboarding ----

    /// Evaluate the onboarding state machine and navigate
    pub async fn update_available_screen(&self) -> WalletResult<()> {
        let current = self.state.borrow().state;
        let flags = OnboardingFlags::load(
            self.stores.application.as_ref(),
            self.stores.application_secure.as_ref(),
        )
        .await;

        let step = next_step(current, &flags);
        if let Some(next) = step.state {
            self.transition(next)?;
        }
        if let Some(route) = step.route {
            self.navigate(route);
        }
        Ok(())
    }

    /// Current onboarding flags
    pub async fn onboarding_flags(&self) -> OnboardingFlags {
        OnboardingFlags::load(
            self.stores.application.as_ref(),
            self.stores.application_secure.as_ref(),
        )
        .await
    }

    pub async fn skip_introduction(&self) -> WalletResult<()> {
        self.stores.application.add(keys::INTRODUCTION, Value::Bool(true)).await?;
        self.update_available_screen().await
    }

    /// Mark the tutorial as seen; the current screen stays
    pub async fn skip_tutorial(&self) -> WalletResult<()> {
        self.stores.application.add(keys::TUTORIAL, Value::Bool(true)).await?;
        Ok(())
    }

    // ---- PIN ----

    /// Store a new PIN and enter the wallet.
    ///
    /// Refused while locked: changing the PIN requires authenticating first.
    pub async fn set_pin(&self, pin: &SecretString) -> WalletResult<()> {
        let current = self.state.borrow().state;
        if current == AppState::Unauthenticated {
            return Err(WalletError::InvalidTransition {
                from: current,
                to: AppState::Authenticated,
            });
        }

        self.pins.set(pin).await?;
        if current == AppState::Starting {
            self.transition(AppState::NoPin)?;
        }
        self.transition(AppState::Authenticated)?;
        info!("PIN set");
        self.update_available_screen().await
    }

    /// Enter the wallet after the host verified the user (PIN or biometrics)
    pub async fn authenticate(&self) -> WalletResult<()> {
        let current = self.state.borrow().state;
        if current == AppState::NoPin {
            return Err(WalletError::InvalidTransition {
                from: current,
                to: AppState::Authenticated,
            });
        }
        self.transition(AppState::Authenticated)?;
        self.update_available_screen().await
    }

    /// Compare `pin` with the stored PIN
    pub async fn validate_pin(&self, pin: &SecretString) -> WalletResult<bool> {
        Ok(self.pins.validate(pin).await?)
    }

    /// Validate `pin`, then authenticate
    pub async fn unlock(&self, pin: &SecretString) -> WalletResult<()> {
        if !self.pins.validate(pin).await? {
            warn!("unlock attempted with wrong PIN");
            return Err(WalletError::InvalidPin);
        }
        self.authenticate().await
    }

    /// Return to the authenticate overlay
    pub fn lock(&self) -> WalletResult<()> {
        let current = self.state.borrow().state;
        if current != AppState::Authenticated {
            return Err(WalletError::InvalidTransition {
                from: current,
                to: AppState::Unauthenticated,
            });
        }
        self.transition(AppState::Unauthenticated)
    }

    // ---- DID ----

    /// Create a DID with `did_method` (configured default when `None`).
    ///
    /// Nothing is recorded unless the engine succeeds.
    pub async fn create_did(
        &self,
        did_method: Option<&str>,
        keys_to_import: Vec<Value>,
    ) -> WalletResult<Did> {
        let request = CreateDidRequest {
            dwn_url: self.config.agent.dwn_url.clone(),
            did_method: did_method
                .unwrap_or(self.config.agent.did_method.as_str())
                .to_string(),
            keys_to_import,
            prevent_credential_creation: true,
        };

        let did = self.engine.create_did(request).await.map_err(|e| {
            error!(error = %e, "DID creation failed");
            e
        })?;
        info!(did = %did, "DID created");

        self.stores.application.add(keys::WITH_DID, Value::Bool(true)).await?;
        self.update_available_screen().await?;
        Ok(did)
    }

    /// Import a plain-text key export and make its DID operational
    pub async fn import_did(&self, export: Value) -> WalletResult<Did> {
        let did = self.engine.import_keys(export).await.map_err(|e| {
            error!(error = %e, "DID import failed");
            e
        })?;
        info!(did = %did, "DID imported");

        self.stores.application.add(keys::WITH_DID, Value::Bool(true)).await?;
        self.update_available_screen().await?;
        Ok(did)
    }

    pub async fn export_did(&self) -> WalletResult<Value> {
        Ok(self.engine.export_keys().await?)
    }

    pub fn current_did(&self) -> Option<Did> {
        self.engine.operational_did()
    }

    /// The user confirmed they saved their DID
    pub async fn confirm_did(&self) -> WalletResult<()> {
        self.stores.application.add(keys::CONFIRMED_DID, Value::Bool(true)).await?;
        self.update_available_screen().await
    }

    // ---- credentials ----

    pub async fn add_credential(&self, record: CredentialRecord) -> WalletResult<()> {
        self.engine.save_credential(&record).await?;
        self.state.send_modify(|state| state.credentials.push(record));
        Ok(())
    }

    pub async fn remove_credential(&self, id: &str) -> WalletResult<()> {
        self.engine.remove_credential(id).await?;
        self.state
            .send_modify(|state| state.credentials.retain(|c| c.id() != Some(id)));
        Ok(())
    }

    pub fn credential(&self, id: &str) -> WalletResult<CredentialRecord> {
        self.state
            .borrow()
            .credentials
            .iter()
            .find(|c| c.id() == Some(id))
            .cloned()
            .ok_or_else(|| WalletError::CredentialNotFound(id.to_string()))
    }

    /// Replace the credential list with the engine's store
    pub async fn refresh_credentials(&self) -> WalletResult<()> {
        let credentials = self.engine.credentials().await?;
        debug!(count = credentials.len(), "credentials refreshed");
        self.state.send_modify(|state| state.credentials = credentials);
        Ok(())
    }

    // ---- notifications ----

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Mark a notification read and resume the flow it postponed.
    ///
    /// Invitations are replayed to the engine in the background; this
    /// returns once the read mark is persisted.
    pub async fn read_notification(&self, id: &str) -> WalletResult<NotificationRecord> {
        let record = self.notifications.mark_read(id).await?;
        let extra = record.extra.clone();

        match record.kind {
            NotificationType::IssueCredential => self.navigate(Route::AcceptCredentials {
                credentials: extra.credentials.unwrap_or_default(),
                issuer: extra.issuer.unwrap_or_default(),
            }),
            NotificationType::PresentationAck => self.navigate(Route::VerificationResult {
                status: extra.status,
                code: extra.code,
            }),
            NotificationType::OfferCredential | NotificationType::RequestPresentation => {
                match extra.message {
                    Some(message) => self.spawn_message(InboundMessage::new(message)),
                    None => warn!(id, "invitation notification without a message"),
                }
            }
            NotificationType::ProblemReport | NotificationType::InitDid => {}
        }
        Ok(record)
    }

    pub async fn remove_notification(&self, id: &str) -> WalletResult<()> {
        self.notifications.remove(id).await?;
        Ok(())
    }

    // ---- reset ----

    /// Wipe every wallet namespace and restart.
    ///
    /// Each clear runs regardless of the others failing.
    pub async fn reset(&self) {
        info!("resetting wallet");
        let (application_secure, agent_secure, application) = tokio::join!(
            self.stores.application_secure.clear(),
            self.stores.agent_secure.clear(),
            self.stores.application.clear(),
        );
        for (namespace, result) in [
            ("application (secure)", application_secure),
            ("agent (secure)", agent_secure),
            ("application", application),
        ] {
            if let Err(e) = result {
                warn!(namespace, error = %e, "failed to clear namespace during reset");
            }
        }
        self.restarter.restart();
    }

    // ---- internals ----

    fn transition(&self, next: AppState) -> WalletResult<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.state == next {
                return false;
            }
            if !state.state.can_transition_to(next) {
                result = Err(WalletError::InvalidTransition {
                    from: state.state,
                    to: next,
                });
                return false;
            }
            debug!(from = %state.state, to = %next, "state transition");
            state.state = next;
            true
        });
        result
    }

    fn navigate(&self, route: Route) {
        match self.navigator.get() {
            Some(navigator) => {
                debug!(route = %route, "navigating");
                navigator.navigate(route);
            }
            None => warn!(route = %route, "navigation before initialize, dropped"),
        }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn ProtocolEngine> {
        &self.engine
    }
}

fn replace(slot: &mut bool, value: bool) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
