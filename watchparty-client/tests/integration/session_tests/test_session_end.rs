use std::time::Duration;
use watchparty_client::{EndReason, LocalAction, MeshError, SessionPhase, SessionView};
use watchparty_core::{SignalCommand, SignalEvent};

use crate::integration::{id, init_tracing, records};
use crate::utils::{TestSession, WAIT_TIMEOUT_MS};

async fn with_links() -> TestSession {
    let session = TestSession::joined("AAAAA").await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB", "CCCCC"])))
        .await;
    session
        .wait_for_view(|v| v.links.len() == 2)
        .await
        .expect("Links should open");
    session
}

fn ended(reason: EndReason) -> impl Fn(&SessionView) -> bool {
    move |v: &SessionView| v.phase == SessionPhase::Ended(reason)
}

#[tokio::test]
async fn test_leave_tears_everything_down() {
    init_tracing();

    let session = with_links().await;
    let links = session.engines.created();

    session.handle.act(LocalAction::Leave).await.unwrap();

    let view = session
        .wait_for_view(ended(EndReason::Left))
        .await
        .expect("Session should end");
    assert!(view.peers.is_empty());
    assert!(view.links.is_empty());
    assert!(links.iter().all(|spec| session.engines.is_destroyed(spec.link_id)));
    assert!(session.signaling.sent().await.contains(&SignalCommand::Leave));
    assert!(session.signaling.was_closed());

    assert_eq!(
        session.handle.act(LocalAction::SetName("ann".into())).await,
        Err(MeshError::SessionEnded)
    );
}

#[tokio::test]
async fn test_channel_closed_ends_without_leave() {
    init_tracing();

    let session = with_links().await;

    session.handle.channel_closed().await;

    let view = session
        .wait_for_view(ended(EndReason::ChannelLost))
        .await
        .expect("Session should end");
    assert!(view.links.is_empty());
    assert!(!session.signaling.sent().await.contains(&SignalCommand::Leave));
}

#[tokio::test]
async fn test_removed_by_host() {
    init_tracing();

    let session = with_links().await;

    session
        .signal(SignalEvent::PeerRemoved { id: id("AAAAA") })
        .await;

    let view = session
        .wait_for_view(ended(EndReason::Evicted))
        .await
        .expect("Eviction should end the session");
    assert!(view.peers.is_empty());
}

#[tokio::test]
async fn test_removal_of_other_peer_is_a_departure() {
    init_tracing();

    let session = with_links().await;

    session
        .signal(SignalEvent::PeerRemoved { id: id("BBBBB") })
        .await;

    let view = session
        .wait_for_view(|v| v.peers.len() == 1)
        .await
        .expect("Removed peer should depart");
    assert_eq!(view.phase, SessionPhase::Joined { local_id: id("AAAAA") });
    assert!(view.link_state(&id("BBBBB")).is_none());
}

#[tokio::test]
async fn test_send_failure_ends_session() {
    init_tracing();

    let session = with_links().await;
    session.signaling.break_channel();

    assert_eq!(
        session.handle.act(LocalAction::SetName("ann".into())).await,
        Err(MeshError::SessionEnded)
    );
    session
        .wait_for_view(ended(EndReason::ChannelLost))
        .await
        .expect("Lost channel should end the session");
}

#[tokio::test]
async fn test_dropping_every_handle_shuts_down() {
    init_tracing();

    let TestSession {
        handle, signaling, ..
    } = with_links().await;
    let mut view_rx = handle.subscribe();

    drop(handle);

    tokio::time::timeout(
        Duration::from_millis(WAIT_TIMEOUT_MS),
        view_rx.wait_for(|v| v.phase == SessionPhase::Ended(EndReason::Shutdown)),
    )
    .await
    .expect("Timed out waiting for shutdown")
    .expect("Final view should be published");
    assert!(signaling.was_closed());
}
