//! Wallet notifications
//!
//! A notification is recorded when a protocol message reaches the wallet
//! outside a live session. The record is prepended to the in-memory list,
//! the whole list is persisted under [`keys::NOTIFICATIONS`], and a local
//! notification is scheduled so the user hears about it.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::keys;
use crate::model::{ApplicationState, NotificationExtra, NotificationRecord, NotificationType};
use crate::storage::{Storage, StorageError, StorageExt};

mod scheduler;

pub use scheduler::{NotificationScheduler, ScheduledNotification, TimerScheduler};

/// Notification errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// Localization keys for a notification's title and body.
///
/// Acknowledgements pick the `Ok` or `Fail` variant from the presence of a
/// status.
pub fn text_keys(kind: NotificationType, extra: &NotificationExtra) -> (String, String) {
    let base = format!("notifications.{}", kind.as_str());
    match kind {
        NotificationType::PresentationAck if extra.status.is_some() => {
            (format!("{}.titleOk", base), format!("{}.bodyOk", base))
        }
        NotificationType::PresentationAck => {
            (format!("{}.titleFail", base), format!("{}.bodyFail", base))
        }
        _ => (format!("{}.title", base), format!("{}.body", base)),
    }
}

/// Build an unread record with a fresh id
pub fn build_record(kind: NotificationType, extra: NotificationExtra) -> NotificationRecord {
    let (title, body) = text_keys(kind, &extra);
    NotificationRecord {
        id: Uuid::new_v4().to_string(),
        kind,
        title,
        body,
        read: false,
        extra,
    }
}

/// Owns the notification list inside the shared application state
pub struct NotificationCenter {
    storage: Arc<dyn Storage>,
    scheduler: Arc<dyn NotificationScheduler>,
    state: Arc<watch::Sender<ApplicationState>>,
    delay: Duration,
}

impl NotificationCenter {
    pub fn new(
        storage: Arc<dyn Storage>,
        scheduler: Arc<dyn NotificationScheduler>,
        state: Arc<watch::Sender<ApplicationState>>,
        delay: Duration,
    ) -> Self {
        Self {
            storage,
            scheduler,
            state,
            delay,
        }
    }

    /// Load the persisted list into state. A missing or unreadable list
    /// becomes empty.
    pub async fn load(&self) -> usize {
        let notifications: Vec<NotificationRecord> = self
            .storage
            .fetch_or_none(keys::NOTIFICATIONS)
            .await
            .unwrap_or_default();
        let count = notifications.len();
        self.state.send_modify(|state| state.notifications = notifications);
        debug!(count, "loaded notifications");
        count
    }

    /// Record a notification of `kind` and schedule its local delivery
    pub async fn send(
        &self,
        kind: NotificationType,
        extra: NotificationExtra,
    ) -> NotificationResult<NotificationRecord> {
        let record = build_record(kind, extra);
        self.scheduler.schedule(
            ScheduledNotification::from_record(&record),
            self.delay,
        );
        self.add(record.clone()).await?;

        counter!("wallet.notifications.sent", "type" => kind.as_str()).increment(1);
        info!(id = %record.id, kind = %kind, "notification sent");
        Ok(record)
    }

    /// Prepend a record and persist the list
    pub async fn add(&self, record: NotificationRecord) -> NotificationResult<()> {
        self.state
            .send_modify(|state| state.notifications.insert(0, record));
        self.persist().await
    }

    /// Mark `id` as read and return the updated record
    pub async fn mark_read(&self, id: &str) -> NotificationResult<NotificationRecord> {
        let mut found = None;
        self.state.send_if_modified(|state| {
            match state.notifications.iter_mut().find(|n| n.id == id) {
                Some(record) => {
                    let changed = !record.read;
                    record.read = true;
                    found = Some(record.clone());
                    changed
                }
                None => false,
            }
        });
        let record = found.ok_or_else(|| NotificationError::NotFound(id.to_string()))?;
        self.persist().await?;
        Ok(record)
    }

    /// Drop `id` from the list
    pub async fn remove(&self, id: &str) -> NotificationResult<NotificationRecord> {
        let mut removed = None;
        self.state.send_if_modified(|state| {
            match state.notifications.iter().position(|n| n.id == id) {
                Some(index) => {
                    removed = Some(state.notifications.remove(index));
                    true
                }
                None => false,
            }
        });
        let record = removed.ok_or_else(|| NotificationError::NotFound(id.to_string()))?;
        self.persist().await?;
        Ok(record)
    }

    pub fn list(&self) -> Vec<NotificationRecord> {
        self.state.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state
            .borrow()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    // Writes the list as it is right now; concurrent writers race, last wins.
    async fn persist(&self) -> NotificationResult<()> {
        let notifications = self.list();
        self.storage.put(keys::NOTIFICATIONS, &notifications).await?;
        Ok(())
    }
}
