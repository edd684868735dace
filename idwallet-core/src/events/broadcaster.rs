//! Event Broadcasting System
//!
//! Fan-out of agent events to every interested subscriber.

use super::AgentEvent;
use tokio::sync::broadcast;

/// Event broadcaster for agent events
///
/// Engines embed one of these and hand out receivers from
/// [`ProtocolEngine::subscribe`](crate::engine::ProtocolEngine::subscribe).
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event; returns how many subscribers received it
    pub fn emit(&self, event: AgentEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Acknowledgement;

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let broadcaster = EventBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.emit(AgentEvent::AckCompleted(Acknowledgement::ok("m1")));

        match rx.recv().await.unwrap() {
            AgentEvent::AckCompleted(ack) => assert_eq!(ack.message_id, "m1"),
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let broadcaster = EventBroadcaster::new(10);
        assert_eq!(broadcaster.emit(AgentEvent::IdentityInitialized), 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber() {
        let broadcaster = EventBroadcaster::new(10);
        {
            let _rx = broadcaster.subscribe();
            assert_eq!(broadcaster.subscriber_count(), 1);
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
