/*
    exchanges.rs - Live versus deferred protocol exchanges

    A connectable transport gets an immediate screen, anything else gets a
    notification. Redelivered messages are promoted to the live flow.
*/

use idwallet_core::engine::EngineError;
use idwallet_core::events::Acknowledgement;
use idwallet_core::model::{keys, NotificationType, VerifiableCredential};
use idwallet_core::navigation::Route;
use idwallet_core::storage::{Storage, StorageExt};
use idwallet_core::test_utils::{
    assert_completes_within, assert_times_out, fixtures, MockTransport, TestWallet,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn seen(wallet: &TestWallet) -> Vec<String> {
    wallet
        .stores
        .application
        .fetch(keys::ALREADY_SEEN_NOTIFICATIONS)
        .await
        .unwrap()
        .unwrap_or_default()
}

async fn processed_count(wallet: &TestWallet, count: usize) {
    assert_completes_within(Duration::from_secs(2), async {
        while wallet.engine.processed().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

async fn initialized() -> TestWallet {
    let wallet = TestWallet::new();
    wallet.initialize().await;
    wallet.navigator.take();
    wallet
}

/// Connectable ack: disconnect, dispose now, show the result
#[tokio::test]
async fn test_connectable_ack_shows_result() {
    let wallet = initialized().await;
    let transport = Arc::new(MockTransport::connectable("ws-1"));
    wallet.engine.route("m1", transport.clone());
    wallet.coordinator.set_is_connected(true);

    wallet
        .coordinator
        .ack_completed(Acknowledgement::ok("m1"))
        .await
        .unwrap();

    assert!(!wallet.coordinator.snapshot().is_connected);
    assert_eq!(transport.dispose_count(), 1);
    match wallet.navigator.take().as_slice() {
        [Route::VerificationResult { status, code }] => {
            assert_eq!(status.as_deref(), Some("OK"));
            assert!(code.is_none());
        }
        other => panic!("unexpected routes {:?}", other),
    }
    assert!(wallet.coordinator.snapshot().notifications.is_empty());
}

#[tokio::test]
async fn test_connectable_problem_report_shows_code() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m2", Arc::new(MockTransport::connectable("ws-2")));

    wallet
        .coordinator
        .ack_completed(Acknowledgement::problem("m2", "e.p.xfer.cant-process"))
        .await
        .unwrap();

    match wallet.navigator.take().as_slice() {
        [Route::VerificationResult { status, code }] => {
            assert!(status.is_none());
            assert_eq!(code.as_deref(), Some("e.p.xfer.cant-process"));
        }
        other => panic!("unexpected routes {:?}", other),
    }
}

/// Deferred ack becomes a PresentationAck notification with Fail keys
#[tokio::test]
async fn test_deferred_problem_report_notifies() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m3", Arc::new(MockTransport::oneshot("link")));

    wallet
        .coordinator
        .ack_completed(Acknowledgement::problem("m3", "e.p.timeout"))
        .await
        .unwrap();

    let notifications = wallet.coordinator.snapshot().notifications;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationType::PresentationAck);
    assert!(notifications[0].title.ends_with(".titleFail"));
    assert!(wallet.navigator.paths().is_empty());
}

/// First store-and-forward delivery: seen list, one notification,
/// connection flag untouched
#[tokio::test]
async fn test_first_deferred_arrival_notifies_once() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m4", Arc::new(MockTransport::oneshot("relay")));
    wallet.coordinator.set_is_connected(true);

    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("m4"))
        .await
        .unwrap();

    assert_eq!(seen(&wallet).await, vec!["m4".to_string()]);
    let state = wallet.coordinator.snapshot();
    assert!(state.is_connected);
    assert_eq!(state.notifications.len(), 1);
    assert_eq!(state.notifications[0].kind, NotificationType::IssueCredential);
    assert_eq!(
        state.notifications[0].extra.credentials,
        Some(vec![fixtures::credential("m4")])
    );
    assert_eq!(wallet.scheduler.scheduled().len(), 1);
    assert!(wallet.navigator.paths().is_empty());
}

/// Redelivery: seen entry removed, live flow, no new notification
#[tokio::test]
async fn test_redelivered_arrival_goes_live() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m5", Arc::new(MockTransport::oneshot("relay")));

    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("m5"))
        .await
        .unwrap();
    wallet.coordinator.set_is_connected(true);

    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("m5"))
        .await
        .unwrap();

    assert!(seen(&wallet).await.is_empty());
    let state = wallet.coordinator.snapshot();
    assert!(!state.is_connected);
    assert_eq!(state.notifications.len(), 1);
    assert_eq!(wallet.navigator.paths(), vec!["AcceptCredentials"]);
}

#[tokio::test]
async fn test_unknown_transport_is_store_and_forward() {
    let wallet = initialized().await;
    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("orphan"))
        .await
        .unwrap();
    assert_eq!(seen(&wallet).await, vec!["orphan".to_string()]);
    assert_eq!(wallet.coordinator.snapshot().notifications.len(), 1);
}

/// Live arrival disposes the socket only after the grace period
#[tokio::test(start_paused = true)]
async fn test_connectable_arrival_disposes_after_delay() {
    let wallet = initialized().await;
    let transport = Arc::new(MockTransport::connectable("ws-3"));
    wallet.engine.route("m6", transport.clone());
    wallet.coordinator.set_is_connected(true);

    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("m6"))
        .await
        .unwrap();

    assert!(!wallet.coordinator.snapshot().is_connected);
    match wallet.navigator.take().as_slice() {
        [Route::AcceptCredentials { credentials, issuer }] => {
            assert_eq!(credentials, &vec![fixtures::credential("m6")]);
            assert_eq!(issuer, &fixtures::issuer());
        }
        other => panic!("unexpected routes {:?}", other),
    }
    assert!(seen(&wallet).await.is_empty());

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert_eq!(transport.dispose_count(), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(transport.dispose_count(), 1);
}

/// Live credential application waits for the selection screen
#[tokio::test]
async fn test_live_application_waits_for_selection() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m7", Arc::new(MockTransport::connectable("ws-4")));
    wallet.coordinator.set_is_connected(true);
    let holder = wallet.engine.holder().unwrap();

    let pending = tokio::spawn(async move {
        holder
            .credential_application(fixtures::application("m7", true))
            .await
    });

    let route = wallet.navigator.next_route().await;
    assert!(!wallet.coordinator.snapshot().is_connected);
    let chosen = vec![VerifiableCredential::new(json!({"id": "urn:uuid:dni"}))];
    match route {
        Route::PresentCredentials {
            inputs,
            credentials_to_receive,
            responder,
            ..
        } => {
            assert_eq!(inputs.len(), 1);
            assert_eq!(credentials_to_receive.len(), 1);
            assert!(responder.respond(chosen.clone()));
        }
        other => panic!("unexpected route {:?}", other),
    }

    let result = assert_completes_within(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result, chosen);
    // Still on a live session
    assert!(wallet.coordinator.snapshot().is_connected);
}

#[tokio::test]
async fn test_closed_selection_declines() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m8", Arc::new(MockTransport::connectable("ws-5")));
    let holder = wallet.engine.holder().unwrap();

    let pending = tokio::spawn(async move {
        holder
            .credential_application(fixtures::application("m8", false))
            .await
    });

    drop(wallet.navigator.next_route().await);
    let result = assert_completes_within(Duration::from_secs(1), pending)
        .await
        .unwrap();
    assert!(matches!(result, Err(EngineError::Declined(_))));
}

/// Deferred application never resolves; reading the notification replays
/// the message, which then comes back as a live exchange
#[tokio::test]
async fn test_deferred_application_replays_from_notification() {
    let wallet = initialized().await;
    wallet
        .engine
        .route("m9", Arc::new(MockTransport::oneshot("link")));
    let holder = wallet.engine.holder().unwrap();

    assert_times_out(
        Duration::from_millis(200),
        holder.credential_application(fixtures::application("m9", false)),
    )
    .await;

    let notifications = wallet.coordinator.snapshot().notifications;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationType::RequestPresentation);
    assert_eq!(seen(&wallet).await, vec!["m9".to_string()]);

    wallet
        .coordinator
        .read_notification(&notifications[0].id)
        .await
        .unwrap();
    processed_count(&wallet, 1).await;
    let replayed = wallet.engine.processed();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].message["id"], json!("m9"));
    assert!(wallet.coordinator.snapshot().notifications[0].read);

    // The engine re-runs the exchange; this time it is live
    let holder = wallet.engine.holder().unwrap();
    let pending = tokio::spawn(async move {
        holder
            .credential_application(fixtures::application("m9", false))
            .await
    });
    match wallet.navigator.next_route().await {
        Route::PresentCredentials { responder, .. } => {
            responder.respond(Vec::new());
        }
        other => panic!("unexpected route {:?}", other),
    }
    assert!(pending.await.unwrap().unwrap().is_empty());
    assert!(seen(&wallet).await.is_empty());
    assert_eq!(wallet.coordinator.snapshot().notifications.len(), 1);
}

/// Reading an invitation returns while the replayed exchange waits on the user
#[tokio::test]
async fn test_reading_invitation_does_not_wait_for_selection() {
    let wallet = initialized().await;
    wallet.engine.ask_holder(true);
    let holder = wallet.engine.holder().unwrap();
    assert_times_out(
        Duration::from_millis(50),
        holder.credential_application(fixtures::application("m13", false)),
    )
    .await;
    let notification = wallet.coordinator.snapshot().notifications[0].clone();

    let record = assert_completes_within(
        Duration::from_secs(2),
        wallet.coordinator.read_notification(&notification.id),
    )
    .await
    .unwrap();
    assert!(record.read);

    // The replay reaches the holder as a redelivery and goes live
    match assert_completes_within(Duration::from_secs(2), wallet.navigator.next_route()).await {
        Route::PresentCredentials { responder, .. } => {
            assert!(responder.respond(Vec::new()));
        }
        other => panic!("unexpected route {:?}", other),
    }
    assert!(seen(&wallet).await.is_empty());
    assert_eq!(wallet.engine.processed()[0].message["id"], json!("m13"));
}

/// A parked deferred application does not keep the wallet alive
#[tokio::test]
async fn test_deferred_application_releases_coordinator() {
    let wallet = initialized().await;
    let holder = wallet.engine.holder().unwrap();
    let pending = tokio::spawn(async move {
        holder
            .credential_application(fixtures::application("m14", false))
            .await
    });
    assert_completes_within(Duration::from_secs(2), async {
        while wallet.coordinator.snapshot().notifications.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    let TestWallet {
        coordinator,
        engine,
        ..
    } = wallet;
    let weak = Arc::downgrade(&coordinator);
    drop(coordinator);

    assert!(weak.upgrade().is_none());
    assert!(!pending.is_finished());

    // Later requests are declined instead of parked
    let holder = engine.holder().unwrap();
    assert!(matches!(
        holder
            .credential_application(fixtures::application("m15", false))
            .await,
        Err(EngineError::Declined(_))
    ));
    pending.abort();
}

#[tokio::test]
async fn test_offer_notification_kind() {
    let wallet = initialized().await;
    let holder = wallet.engine.holder().unwrap();
    assert_times_out(
        Duration::from_millis(50),
        holder.credential_application(fixtures::application("m10", true)),
    )
    .await;
    assert_eq!(
        wallet.coordinator.snapshot().notifications[0].kind,
        NotificationType::OfferCredential
    );
}

/// Reading a deferred arrival opens the acceptance screen from stored data
#[tokio::test]
async fn test_read_notification_navigates() {
    let wallet = initialized().await;
    wallet
        .coordinator
        .credential_arrived(fixtures::arrival("m11"))
        .await
        .unwrap();
    wallet
        .coordinator
        .ack_completed(Acknowledgement::ok("m12"))
        .await
        .unwrap();

    let notifications = wallet.coordinator.snapshot().notifications;
    assert_eq!(wallet.coordinator.notifications().unread_count(), 2);

    // Newest first: the acknowledgement
    wallet
        .coordinator
        .read_notification(&notifications[0].id)
        .await
        .unwrap();
    wallet
        .coordinator
        .read_notification(&notifications[1].id)
        .await
        .unwrap();

    let routes = wallet.navigator.take();
    assert!(matches!(
        routes.as_slice(),
        [Route::VerificationResult { .. }, Route::AcceptCredentials { .. }]
    ));
    assert_eq!(wallet.coordinator.notifications().unread_count(), 0);

    assert!(matches!(
        wallet.coordinator.read_notification("missing").await,
        Err(idwallet_core::WalletError::NotificationNotFound(_))
    ));

    wallet
        .coordinator
        .remove_notification(&notifications[0].id)
        .await
        .unwrap();
    let persisted = wallet
        .stores
        .application
        .get(keys::NOTIFICATIONS)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_credential_operations_go_through_engine() {
    let wallet = initialized().await;
    let record = fixtures::credential("c1");

    wallet.coordinator.add_credential(record.clone()).await.unwrap();
    assert_eq!(wallet.engine.stored_credentials(), vec![record.clone()]);
    assert_eq!(
        wallet.coordinator.credential("urn:uuid:c1").unwrap(),
        record
    );

    wallet.coordinator.remove_credential("urn:uuid:c1").await.unwrap();
    assert!(wallet.engine.stored_credentials().is_empty());
    assert!(wallet.coordinator.snapshot().credentials.is_empty());
    assert!(wallet.coordinator.credential("urn:uuid:c1").is_err());
}
