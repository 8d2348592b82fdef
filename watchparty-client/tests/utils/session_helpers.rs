use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use watchparty_client::{
    ClientConfig, MediaCapture, MeshCoordinator, MeshHandle, MeshServices, SessionView,
    SyntheticCapture,
};
use watchparty_core::{SignalCommand, SignalEvent};

use super::mock_engine::MockEngineFactory;
use super::mock_player::RecordingPlayer;
use super::mock_signaling::MockSignalingOutput;

/// Timeout for view and command waits (ms).
pub const WAIT_TIMEOUT_MS: u64 = 2000;

/// How long to let the coordinator run before asserting nothing happened (ms).
pub const SETTLE_MS: u64 = 50;

/// One coordinator wired to mocks.
pub struct TestSession {
    pub handle: MeshHandle,
    pub signaling: MockSignalingOutput,
    pub sent_rx: mpsc::UnboundedReceiver<SignalCommand>,
    pub engines: MockEngineFactory,
    pub player: RecordingPlayer,
}

pub struct TestSessionConfig {
    pub client: ClientConfig,
    pub engines: MockEngineFactory,
    pub capture: Arc<dyn MediaCapture>,
}

impl Default for TestSessionConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            engines: MockEngineFactory::new(),
            capture: Arc::new(SyntheticCapture::new()),
        }
    }
}

impl TestSession {
    /// Starts a coordinator that has not been assigned an id yet.
    pub fn start(config: TestSessionConfig) -> Self {
        let (signaling, sent_rx) = MockSignalingOutput::new();
        let player = RecordingPlayer::new();

        let handle = MeshCoordinator::spawn(
            config.client,
            MeshServices {
                signaling: Arc::new(signaling.clone()),
                engines: Arc::new(config.engines.clone()),
                capture: config.capture,
                player: Box::new(player.clone()),
            },
        );

        Self {
            handle,
            signaling,
            sent_rx,
            engines: config.engines,
            player,
        }
    }

    /// Starts a coordinator and assigns it `local_id`.
    pub async fn joined(local_id: &str) -> Self {
        Self::joined_with(local_id, TestSessionConfig::default()).await
    }

    pub async fn joined_with(local_id: &str, config: TestSessionConfig) -> Self {
        let session = Self::start(config);
        session
            .signal(SignalEvent::SessionAssigned {
                id: local_id.into(),
            })
            .await;
        session
            .wait_for_view(|v| v.phase.local_id().is_some())
            .await
            .unwrap();
        session
    }

    pub async fn signal(&self, event: SignalEvent) {
        self.handle.signal(event).await.unwrap();
    }

    pub async fn wait_for_view(&self, matches: impl Fn(&SessionView) -> bool) -> Result<SessionView> {
        wait_for_view(&self.handle, matches, WAIT_TIMEOUT_MS).await
    }

    pub async fn wait_for_command(
        &mut self,
        matches: impl Fn(&SignalCommand) -> bool,
    ) -> Result<SignalCommand> {
        wait_for_command(&mut self.sent_rx, matches, WAIT_TIMEOUT_MS).await
    }
}

/// Wait until the published view satisfies `matches`.
pub async fn wait_for_view(
    handle: &MeshHandle,
    matches: impl Fn(&SessionView) -> bool,
    timeout_ms: u64,
) -> Result<SessionView> {
    let mut rx = handle.subscribe();
    let waited = tokio::time::timeout(Duration::from_millis(timeout_ms), rx.wait_for(|v| matches(v)))
        .await
        .map(|seen| seen.map(|view| view.clone()));

    match waited {
        Ok(Ok(view)) => Ok(view),
        Ok(Err(_)) => {
            let last = rx.borrow().clone();
            if matches(&last) {
                return Ok(last);
            }
            bail!("Coordinator stopped before the view matched: {:?}", last)
        }
        Err(_) => bail!(
            "Timed out after {}ms waiting for view, last: {:?}",
            timeout_ms,
            handle.view()
        ),
    }
}

/// Wait for an outgoing command matching `matches`, skipping others.
pub async fn wait_for_command(
    sent_rx: &mut mpsc::UnboundedReceiver<SignalCommand>,
    matches: impl Fn(&SignalCommand) -> bool,
    timeout_ms: u64,
) -> Result<SignalCommand> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        match tokio::time::timeout_at(deadline, sent_rx.recv()).await {
            Ok(Some(command)) if matches(&command) => return Ok(command),
            Ok(Some(_)) => continue,
            Ok(None) => bail!("Signaling mock dropped"),
            Err(_) => bail!("Timed out after {}ms waiting for command", timeout_ms),
        }
    }
}

/// Gives the coordinator time to handle whatever is in flight.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(SETTLE_MS)).await;
}
