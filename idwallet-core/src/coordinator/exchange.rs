//! Live versus deferred exchanges
//!
//! Whether an inbound protocol message gets an immediate screen or a
//! notification depends on two things only: whether the transport it came
//! over is connectable, and whether its id was already surfaced once as a
//! notification. A redelivered message is promoted to the live flow.

use async_trait::async_trait;
use metrics::counter;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::{lock, SessionCoordinator};
use crate::engine::{
    CredentialApplication, CredentialApplicationHandler, EngineError, EngineResult,
};
use crate::error::WalletResult;
use crate::events::{Acknowledgement, CredentialArrival};
use crate::model::keys;
use crate::model::{NotificationExtra, NotificationType, VerifiableCredential};
use crate::navigation::{Route, SelectionResponder};
use crate::storage::{StorageExt, StorageResult};
use crate::transport::{dispose_after, TransportHandle};

/// Outcome of a credential application
#[derive(Debug)]
pub(crate) enum Application {
    Selected(Vec<VerifiableCredential>),
    /// Parked as a notification; the exchange never completes
    Deferred,
}

/// How a message is handled
#[derive(Debug)]
pub(crate) enum Delivery {
    /// Show it now
    Live {
        transport: Option<TransportHandle>,
        connectable: bool,
    },
    /// Surface it as a notification
    Deferred,
}

impl SessionCoordinator {
    /// Classify `message_id` and update the seen list accordingly.
    ///
    /// Unknown transports count as store-and-forward.
    pub(crate) async fn resolve_delivery(&self, message_id: &str) -> StorageResult<Delivery> {
        let transport = self.engine().transport_for_message(message_id);
        let connectable = transport
            .as_ref()
            .map(|t| t.is_connectable())
            .unwrap_or(false);

        let application = self.stores.application.as_ref();
        let mut seen: Vec<String> = application
            .fetch_or_none(keys::ALREADY_SEEN_NOTIFICATIONS)
            .await
            .unwrap_or_default();
        let already_seen = seen.iter().any(|id| id == message_id);

        if already_seen {
            seen.retain(|id| id != message_id);
            application
                .put(keys::ALREADY_SEEN_NOTIFICATIONS, &seen)
                .await?;
            counter!("wallet.messages.redelivered").increment(1);
            debug!(message_id, "redelivered message promoted to live flow");
        }

        if connectable || already_seen {
            counter!("wallet.exchanges.live").increment(1);
            return Ok(Delivery::Live {
                transport,
                connectable,
            });
        }

        seen.push(message_id.to_string());
        application
            .put(keys::ALREADY_SEEN_NOTIFICATIONS, &seen)
            .await?;
        counter!("wallet.exchanges.deferred").increment(1);
        Ok(Delivery::Deferred)
    }

    /// Issued credentials arrived
    pub async fn credential_arrived(&self, arrival: CredentialArrival) -> WalletResult<()> {
        let CredentialArrival {
            credentials,
            issuer,
            message_id,
        } = arrival;

        match self.resolve_delivery(&message_id).await? {
            Delivery::Live {
                transport,
                connectable,
            } => {
                // The exchange is over either way; nothing is pending
                self.set_is_connected(false);
                if let (true, Some(transport)) = (connectable, transport) {
                    dispose_after(transport, self.config.transport.dispose_delay);
                }
                info!(message_id = %message_id, count = credentials.len(), "credentials arrived");
                self.navigate(Route::AcceptCredentials {
                    credentials,
                    issuer,
                });
            }
            Delivery::Deferred => {
                self.notifications
                    .send(
                        NotificationType::IssueCredential,
                        NotificationExtra::issued(credentials, issuer),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// A verifier acknowledged a presentation, or a counterparty reported a
    /// problem
    pub async fn ack_completed(&self, ack: Acknowledgement) -> WalletResult<()> {
        let Acknowledgement {
            status,
            message_id,
            code,
        } = ack;

        match self.resolve_delivery(&message_id).await? {
            Delivery::Live {
                transport,
                connectable,
            } => {
                self.set_is_connected(false);
                if let (true, Some(transport)) = (connectable, transport) {
                    transport.dispose();
                }
                info!(message_id = %message_id, status = ?status, code = ?code, "exchange completed");
                let route = match status {
                    Some(status) => Route::VerificationResult {
                        status: Some(status),
                        code: None,
                    },
                    None => Route::VerificationResult { status: None, code },
                };
                self.navigate(route);
            }
            Delivery::Deferred => {
                self.notifications
                    .send(
                        NotificationType::PresentationAck,
                        NotificationExtra::acknowledgement(status, code),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Holder decision for an issuer- or verifier-proposed exchange.
    ///
    /// Live: show the selection screen and wait for the user. Deferred:
    /// record a notification and never resolve; the engine drops the
    /// future to cancel.
    pub async fn credential_application(
        &self,
        request: CredentialApplication,
    ) -> EngineResult<Vec<VerifiableCredential>> {
        match self.apply(request).await? {
            Application::Selected(credentials) => Ok(credentials),
            Application::Deferred => std::future::pending().await,
        }
    }

    pub(crate) async fn apply(&self, request: CredentialApplication) -> EngineResult<Application> {
        match self.resolve_delivery(&request.message_id).await? {
            Delivery::Live { connectable, .. } => {
                if connectable {
                    self.set_is_connected(false);
                }

                let (responder, selection) = SelectionResponder::new();
                self.navigate(Route::PresentCredentials {
                    inputs: request.inputs,
                    issuer: request.issuer,
                    credentials_to_receive: request.credentials_to_receive,
                    responder,
                });

                let credentials = selection.await.map_err(|_| {
                    EngineError::Declined(format!(
                        "selection for {} closed without an answer",
                        request.message_id
                    ))
                })?;
                self.set_is_connected(connectable);
                debug!(message_id = %request.message_id, count = credentials.len(), "credentials selected");
                Ok(Application::Selected(credentials))
            }
            Delivery::Deferred => {
                let kind = if request.credentials_to_receive.is_empty() {
                    NotificationType::RequestPresentation
                } else {
                    NotificationType::OfferCredential
                };
                if let Err(e) = self
                    .notifications
                    .send(kind, NotificationExtra::invitation(request.issuer, request.message))
                    .await
                {
                    warn!(message_id = %request.message_id, error = %e, "failed to record invitation");
                }
                Ok(Application::Deferred)
            }
        }
    }

    /// The user cancelled a pending live exchange
    pub fn close_connection(&self) {
        self.set_is_connected(false);
        if let Some(transport) = lock(&self.live_transport).take() {
            debug!(transport = transport.id(), "closing live transport");
            transport.dispose();
        }
    }

    pub(crate) fn transport_connected(&self, transport: TransportHandle) {
        debug!(transport = transport.id(), "transport connected");
        *lock(&self.live_transport) = Some(transport);
        self.set_is_connected(true);
    }

    pub(crate) fn transport_disconnected(&self, transport: TransportHandle) {
        debug!(transport = transport.id(), "transport disconnected");
        let mut live = lock(&self.live_transport);
        if live.as_ref().is_some_and(|t| Arc::ptr_eq(t, &transport)) {
            *live = None;
        }
        drop(live);
        self.set_is_connected(false);
    }
}

/// Engine-facing holder callback.
///
/// Holds the coordinator weakly so the engine never keeps it alive, not even
/// while a deferred application is parked.
pub(crate) struct HolderBridge {
    coordinator: Weak<SessionCoordinator>,
}

impl HolderBridge {
    pub(crate) fn new(coordinator: Weak<SessionCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl CredentialApplicationHandler for HolderBridge {
    async fn credential_application(
        &self,
        request: CredentialApplication,
    ) -> EngineResult<Vec<VerifiableCredential>> {
        let application = {
            let coordinator = self
                .coordinator
                .upgrade()
                .ok_or_else(|| EngineError::Declined("wallet shut down".to_string()))?;
            coordinator.apply(request).await?
        };
        match application {
            Application::Selected(credentials) => Ok(credentials),
            Application::Deferred => std::future::pending().await,
        }
    }
}
