use watchparty_client::{LocalAction, MeshError};
use watchparty_core::{SignalCommand, SignalEvent};

use crate::integration::{id, init_tracing, records};
use crate::utils::{TestSession, TestSessionConfig};

async fn with_peers() -> TestSession {
    let session = TestSession::joined("AAAAA").await;
    session
        .signal(SignalEvent::MembershipSnapshot(records(&["BBBBB", "CCCCC"])))
        .await;
    session
        .wait_for_view(|v| v.peers.len() == 2)
        .await
        .expect("Peers should be listed");
    session
}

#[tokio::test]
async fn test_chat_sent_to_everyone_and_logged() {
    init_tracing();

    let session = with_peers().await;
    session.handle.act(LocalAction::SetName("ann".into())).await.unwrap();

    session
        .handle
        .act(LocalAction::SendChat("  hello  ".into()))
        .await
        .unwrap();

    let chats: Vec<_> = session
        .signaling
        .sent()
        .await
        .into_iter()
        .filter(|c| matches!(c, SignalCommand::SendMessage { .. }))
        .collect();
    assert_eq!(
        chats,
        vec![
            SignalCommand::SendMessage {
                to: id("BBBBB"),
                text: "hello".into(),
                name: Some("ann".into()),
            },
            SignalCommand::SendMessage {
                to: id("CCCCC"),
                text: "hello".into(),
                name: Some("ann".into()),
            },
        ]
    );

    let view = session.handle.view();
    assert_eq!(view.chat.len(), 1);
    assert!(view.chat[0].local);
    assert_eq!(view.chat[0].name, "ann");
}

#[tokio::test]
async fn test_incoming_chat_labelled_by_name_or_id() {
    init_tracing();

    let session = with_peers().await;

    session
        .signal(SignalEvent::ChatMessage {
            from: id("BBBBB"),
            name: Some("bob".into()),
            text: "hi".into(),
        })
        .await;
    session
        .signal(SignalEvent::ChatMessage {
            from: id("DDDDD"),
            name: None,
            text: "yo".into(),
        })
        .await;

    let view = session
        .wait_for_view(|v| v.chat.len() == 2)
        .await
        .expect("Both messages should be logged");
    assert_eq!(view.chat[0].name, "bob");
    assert_eq!(view.chat[1].name, "DDDDD");
    assert!(view.chat.iter().all(|entry| !entry.local));
    // An unknown sender is registered as it speaks.
    assert!(view.peer(&id("DDDDD")).is_some());
}

#[tokio::test]
async fn test_chat_total_advances_once_history_is_full() {
    init_tracing();

    let mut config = TestSessionConfig::default();
    config.client.chat_history_limit = 2;
    let session = TestSession::joined_with("AAAAA", config).await;

    for _ in 0..3 {
        session
            .signal(SignalEvent::ChatMessage {
                from: id("BBBBB"),
                name: Some("bob".into()),
                text: "lol".into(),
            })
            .await;
    }

    let view = session
        .wait_for_view(|v| v.chat_total == 3)
        .await
        .expect("Every message should be counted");
    assert_eq!(view.chat.len(), 2);
    assert!(view.chat.iter().all(|entry| entry.text == "lol"));
}

#[tokio::test]
async fn test_blank_chat_rejected() {
    init_tracing();

    let session = with_peers().await;

    assert_eq!(
        session.handle.act(LocalAction::SendChat(" \t".into())).await,
        Err(MeshError::EmptyMessage)
    );
    assert_eq!(
        session
            .signaling
            .count(|c| matches!(c, SignalCommand::SendMessage { .. }))
            .await,
        0
    );
}
