use watchparty_core::{PeerRecord, SignalEvent};

use crate::integration::{id, init_tracing};
use crate::utils::TestSession;

#[tokio::test]
async fn test_status_from_unknown_sender_creates_participant() {
    init_tracing();

    let session = TestSession::joined("AAAAA").await;
    session
        .signal(SignalEvent::StatusUpdate {
            from: id("EEEEE"),
            camera_enabled: Some(true),
            mic_enabled: Some(true),
            is_host: None,
        })
        .await;

    let view = session
        .wait_for_view(|v| v.peer(&id("EEEEE")).is_some())
        .await
        .expect("Unknown sender should be registered");
    let eve = view.peer(&id("EEEEE")).unwrap();
    assert!(eve.camera_enabled);
    assert!(eve.microphone_enabled);
}

#[tokio::test]
async fn test_partial_status_keeps_name_and_host() {
    init_tracing();

    let session = TestSession::joined("AAAAA").await;
    let mut bea = PeerRecord::new("BBBBB");
    bea.name = Some("bea".into());
    bea.is_host = Some(true);
    bea.camera_enabled = Some(true);
    session.signal(SignalEvent::PeerUpdated(bea)).await;
    session
        .wait_for_view(|v| v.peer(&id("BBBBB")).is_some())
        .await
        .expect("B should be registered");

    session
        .signal(SignalEvent::StatusUpdate {
            from: id("BBBBB"),
            camera_enabled: Some(false),
            mic_enabled: None,
            is_host: None,
        })
        .await;

    let view = session
        .wait_for_view(|v| v.peer(&id("BBBBB")).is_some_and(|p| !p.camera_enabled))
        .await
        .expect("Camera should turn off");
    let bea = view.peer(&id("BBBBB")).unwrap();
    assert_eq!(bea.display_name.as_deref(), Some("bea"));
    assert!(bea.is_host);
}

#[tokio::test]
async fn test_own_status_echo_is_ignored() {
    init_tracing();

    let session = TestSession::joined("AAAAA").await;
    session
        .signal(SignalEvent::StatusUpdate {
            from: id("AAAAA"),
            camera_enabled: Some(true),
            mic_enabled: None,
            is_host: None,
        })
        .await;
    crate::utils::settle().await;

    let view = session.handle.view();
    assert!(view.peers.is_empty());
    assert!(!view.local.camera_enabled);
}
