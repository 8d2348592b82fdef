use std::collections::HashMap;
use watchparty_client::{LinkRole, LinkState};
use watchparty_core::SignalEvent;

use crate::integration::{id, init_tracing, records};
use crate::utils::{TestSession, spawn_loopback};

/// Two sessions behind a loopback relay. `a_first` decides who learns about
/// the other first.
async fn run_pair(a_first: bool) {
    init_tracing();

    let a = TestSession::joined("AAAAA").await;
    let b = TestSession::joined("BBBBB").await;

    let TestSession {
        handle: a_handle,
        sent_rx: a_rx,
        engines: a_engines,
        signaling: _a_signaling,
        ..
    } = a;
    let TestSession {
        handle: b_handle,
        sent_rx: b_rx,
        engines: b_engines,
        signaling: _b_signaling,
        ..
    } = b;

    let peers = HashMap::from([
        (id("AAAAA"), a_handle.clone()),
        (id("BBBBB"), b_handle.clone()),
    ]);
    spawn_loopback(id("AAAAA"), a_rx, peers.clone());
    spawn_loopback(id("BBBBB"), b_rx, peers);

    let snapshot = SignalEvent::MembershipSnapshot(records(&["AAAAA", "BBBBB"]));
    let (first, second) = if a_first {
        (&a_handle, &b_handle)
    } else {
        (&b_handle, &a_handle)
    };
    first.signal(snapshot.clone()).await.unwrap();
    second.signal(snapshot).await.unwrap();

    for handle in [&a_handle, &b_handle] {
        crate::utils::wait_for_view(
            handle,
            |v| v.links.values().all(|s| *s == LinkState::Connected) && v.links.len() == 1,
            crate::utils::WAIT_TIMEOUT_MS,
        )
        .await
        .expect("Both sides should connect");
    }

    let a_links = a_engines.links_for(&id("BBBBB"));
    let b_links = b_engines.links_for(&id("AAAAA"));
    assert_eq!(a_links.len(), 1);
    assert_eq!(b_links.len(), 1);
    assert_eq!(a_links[0].role, LinkRole::Initiator);
    assert_eq!(b_links[0].role, LinkRole::Responder);
}

#[tokio::test]
async fn test_roles_when_initiator_learns_first() {
    run_pair(true).await;
}

#[tokio::test]
async fn test_roles_when_responder_learns_first() {
    run_pair(false).await;
}
