//! Async test helpers

use std::future::Future;
use tokio::time::{timeout, Duration};

use crate::coordinator::StateSubscription;
use crate::model::ApplicationState;

/// Assert a future completes within `duration`
pub async fn assert_completes_within<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => panic!("Future did not complete within {:?}", duration),
    }
}

/// Assert a future is still pending after `duration`
pub async fn assert_times_out<F, T>(duration: Duration, future: F)
where
    F: Future<Output = T>,
{
    if timeout(duration, future).await.is_ok() {
        panic!("Expected future to time out, but it completed within {:?}", duration);
    }
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the state satisfies `predicate`
pub async fn wait_for_state<P>(
    subscription: &mut StateSubscription,
    duration: Duration,
    predicate: P,
) -> ApplicationState
where
    P: Fn(&ApplicationState) -> bool,
{
    let current = subscription.current();
    if predicate(&current) {
        return current;
    }
    assert_completes_within(duration, async {
        loop {
            match subscription.changed().await {
                Some(state) if predicate(&state) => return state,
                Some(_) => continue,
                None => panic!("coordinator dropped while waiting for state"),
            }
        }
    })
    .await
}
