//! Local notification scheduling

use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, trace};

use crate::model::{NotificationRecord, NotificationType};

/// What the platform shows in its notification tray
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledNotification {
    pub id: String,
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
}

impl ScheduledNotification {
    pub fn from_record(record: &NotificationRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            title: record.title.clone(),
            body: record.body.clone(),
        }
    }
}

/// Host notification scheduler
pub trait NotificationScheduler: Send + Sync {
    /// Surface `notification` after `delay`. Fire and forget.
    fn schedule(&self, notification: ScheduledNotification, delay: Duration);
}

/// Scheduler backed by tokio timers.
///
/// Delivered notifications are logged and published to subscribers; a host
/// shell forwards them to the platform tray.
pub struct TimerScheduler {
    delivered: broadcast::Sender<ScheduledNotification>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::with_capacity(32)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (delivered, _) = broadcast::channel(capacity);
        Self { delivered }
    }

    /// Receive notifications as their timers fire
    pub fn subscribe(&self) -> broadcast::Receiver<ScheduledNotification> {
        self.delivered.subscribe()
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationScheduler for TimerScheduler {
    fn schedule(&self, notification: ScheduledNotification, delay: Duration) {
        trace!(id = %notification.id, ?delay, "scheduling local notification");
        let delivered = self.delivered.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(
                id = %notification.id,
                title = %notification.title,
                "local notification delivered"
            );
            // No subscribers just means nobody is displaying notifications
            let _ = delivered.send(notification);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotificationExtra;
    use crate::notifications::build_record;

    #[tokio::test(start_paused = true)]
    async fn test_delivers_after_delay() {
        let scheduler = TimerScheduler::new();
        let mut rx = scheduler.subscribe();
        let record = build_record(NotificationType::InitDid, NotificationExtra::default());

        scheduler.schedule(
            ScheduledNotification::from_record(&record),
            Duration::from_secs(2),
        );

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.id, record.id);
        assert_eq!(delivered.title, "notifications.init-did.title");
    }
}
