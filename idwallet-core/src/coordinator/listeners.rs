//! Engine event dispatch
//!
//! One task consumes the engine's event stream for the lifetime of an
//! [`EventSubscription`]. Session events (arrivals, acknowledgements,
//! transport lifecycle) are ignored until an operational DID exists; before
//! that only identity events are honoured.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{lock, SessionCoordinator};
use crate::error::WalletResult;
use crate::events::AgentEvent;
use crate::model::{NotificationExtra, NotificationType};

/// Guard for the event listener task. Dropping it stops dispatch.
#[derive(Debug)]
pub struct EventSubscription {
    task: JoinHandle<()>,
}

impl EventSubscription {
    /// Whether the listener is still running
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop dispatching now
    pub fn detach(self) {}
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SessionCoordinator {
    /// Start consuming engine events.
    ///
    /// Attach before [`initialize`](Self::initialize) so the engine's
    /// identity events during startup are seen.
    pub fn attach_listeners(self: &Arc<Self>) -> EventSubscription {
        let mut events = self.engine().subscribe();
        let coordinator = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !dispatch(&coordinator, event).await {
                    break;
                }
            }
            debug!("event listener stopped");
        });

        EventSubscription { task }
    }

    /// Whether session events are being dispatched
    pub fn session_active(&self) -> bool {
        self.session_active.load(Ordering::Acquire)
    }

    async fn enable_session(&self) {
        if self.session_active.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("session events enabled");

        let link = lock(&self.pending_link).take();
        if let Some(link) = link {
            debug!("processing deferred link");
            self.spawn_message(link);
        }
        if let Err(e) = self.refresh_credentials().await {
            warn!(error = %e, "credential refresh failed");
        }
    }

    async fn handle_event(&self, event: AgentEvent) {
        if event.is_session_event() && !self.session_active() {
            trace!(event = event.name(), "session not active, event ignored");
            return;
        }

        let result: WalletResult<()> = match event {
            AgentEvent::IdentityInitialized => {
                if self.current_did().is_some() {
                    self.enable_session().await;
                }
                Ok(())
            }
            AgentEvent::OperationalDidChanged(did) => {
                debug!(did = %did, "operational DID changed");
                self.enable_session().await;
                Ok(())
            }
            AgentEvent::DidCreated(did) => {
                debug!(did = %did, "DID created by engine");
                self.notifications
                    .send(NotificationType::InitDid, NotificationExtra::default())
                    .await
                    .map(|_| ())
                    .map_err(Into::into)
            }
            AgentEvent::CredentialArrived(arrival) => self.credential_arrived(arrival).await,
            AgentEvent::AckCompleted(ack) | AgentEvent::ProblemReport(ack) => {
                self.ack_completed(ack).await
            }
            AgentEvent::TransportConnected(transport) => {
                self.transport_connected(transport);
                Ok(())
            }
            AgentEvent::TransportDisconnected(transport) => {
                self.transport_disconnected(transport);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "event handling failed");
        }
    }
}

/// Returns false once the coordinator is gone
async fn dispatch(coordinator: &Weak<SessionCoordinator>, event: AgentEvent) -> bool {
    match coordinator.upgrade() {
        Some(coordinator) => {
            trace!(event = event.name(), "dispatching event");
            coordinator.handle_event(event).await;
            true
        }
        None => false,
    }
}
