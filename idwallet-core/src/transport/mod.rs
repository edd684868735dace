//! Transport sessions
//!
//! The wallet never inspects concrete transport types. What matters for
//! routing an exchange is a single capability: whether the channel is
//! *connectable* (a session kept open for a synchronous round trip, such as a
//! websocket) or fire-and-forget (deep link, QR, store-and-forward relay).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// A channel the protocol engine received a message over
pub trait Transport: fmt::Debug + Send + Sync {
    /// Stable identifier, used in logs
    fn id(&self) -> &str;

    /// True for session-oriented channels that stay open for a live exchange
    fn is_connectable(&self) -> bool;

    /// Close the channel. Must be idempotent.
    fn dispose(&self);
}

/// Shared reference to a live transport; never copied, since its lifetime
/// tracks the underlying connection
pub type TransportHandle = Arc<dyn Transport>;

/// Dispose `transport` after `delay` on a detached timer.
///
/// The timer is not cancellable; runtime shutdown drops it.
pub fn dispose_after(transport: TransportHandle, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        debug!(transport = transport.id(), "disposing transport after grace period");
        transport.dispose();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn test_dispose_after_waits_for_delay() {
        let transport = Arc::new(MockTransport::connectable("ws-1"));
        let handle = dispose_after(transport.clone(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(2_999)).await;
        assert_eq!(transport.dispose_count(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        handle.await.unwrap();
        assert_eq!(transport.dispose_count(), 1);
    }
}
