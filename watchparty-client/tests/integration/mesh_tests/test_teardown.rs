use watchparty_client::{LinkEvent, LinkState, TrackKind};
use watchparty_core::SignalEvent;

use crate::integration::{id, init_tracing, records};
use crate::utils::{MockEngineFactory, TestSession, TestSessionConfig, settle};

fn silent_config() -> TestSessionConfig {
    TestSessionConfig {
        engines: MockEngineFactory::silent(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_peer_left_removes_participant_and_link() {
    init_tracing();

    let session = TestSession::joined("AAAAA").await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("B should get a link");
    let link = session.engines.links_for(&id("BBBBB"))[0].link_id;

    session
        .signal(SignalEvent::PeerLeft { id: id("BBBBB") })
        .await;

    let view = session
        .wait_for_view(|v| v.peers.is_empty())
        .await
        .expect("B should be removed");
    assert!(view.links.is_empty());
    assert!(view.streams.is_empty());
    assert!(session.engines.is_destroyed(link));
}

#[tokio::test]
async fn test_failed_link_retried_only_on_next_snapshot() {
    init_tracing();

    let session = TestSession::joined_with("AAAAA", silent_config()).await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("B should get a link");
    let first = session.engines.links_for(&id("BBBBB"))[0].clone();

    session.engines.fail(&first);

    let view = session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_none())
        .await
        .expect("Failed link should be cleared");
    assert!(view.peer(&id("BBBBB")).is_some(), "participant stays");
    assert!(session.engines.is_destroyed(first.link_id));

    settle().await;
    assert_eq!(session.engines.links_for(&id("BBBBB")).len(), 1, "no retry loop");

    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("Next snapshot should retry");
    assert_eq!(session.engines.links_for(&id("BBBBB")).len(), 2);
}

#[tokio::test]
async fn test_events_from_replaced_link_are_ignored() {
    init_tracing();

    let session = TestSession::joined_with("AAAAA", silent_config()).await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("B should get a link");
    let stale = session.engines.links_for(&id("BBBBB"))[0].clone();
    session.engines.fail(&stale);
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_none())
        .await
        .expect("Failed link should be cleared");
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("Next snapshot should retry");

    session
        .engines
        .emit(&stale, |remote, link| LinkEvent::Established { remote, link });
    session.engines.attach_media(&stale, TrackKind::Video);
    session.engines.fail(&stale);
    settle().await;

    let view = session.handle.view();
    assert_eq!(view.link_state(&id("BBBBB")), Some(LinkState::Negotiating));
    assert!(view.streams.is_empty());
}

#[tokio::test]
async fn test_remote_media_connects_link() {
    init_tracing();

    let session = TestSession::joined_with("AAAAA", silent_config()).await;
    session
        .signal(SignalEvent::PeerJoined {
            id: id("BBBBB"),
            name: None,
        })
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")) == Some(LinkState::Negotiating))
        .await
        .expect("B should get a link");
    let spec = session.engines.links_for(&id("BBBBB"))[0].clone();

    session.engines.attach_media(&spec, TrackKind::Video);
    session.engines.attach_media(&spec, TrackKind::Audio);

    let view = session
        .wait_for_view(|v| {
            v.streams
                .get(&id("BBBBB"))
                .is_some_and(|m| m.tracks.len() == 2)
        })
        .await
        .expect("Media should be attached");
    assert_eq!(view.link_state(&id("BBBBB")), Some(LinkState::Connected));
}

#[tokio::test]
async fn test_closed_link_is_cleared() {
    init_tracing();

    let session = TestSession::joined_with("AAAAA", silent_config()).await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB"])))
        .await;
    session
        .wait_for_view(|v| v.link_state(&id("BBBBB")).is_some())
        .await
        .expect("B should get a link");
    let spec = session.engines.links_for(&id("BBBBB"))[0].clone();

    session
        .engines
        .emit(&spec, |remote, link| LinkEvent::Closed { remote, link });

    session
        .wait_for_view(|v| v.links.is_empty())
        .await
        .expect("Closed link should be cleared");
}
