use crate::error::MeshError;
use crate::mesh::{LocalAction, MeshInput};
use crate::view::SessionView;
use tokio::sync::{mpsc, oneshot, watch};
use watchparty_core::SignalEvent;

/// Cloneable entry point to a running [`MeshCoordinator`](crate::mesh::MeshCoordinator).
/// The session shuts down once every handle is dropped.
#[derive(Clone)]
pub struct MeshHandle {
    input_tx: mpsc::Sender<MeshInput>,
    view_rx: watch::Receiver<SessionView>,
}

impl MeshHandle {
    pub(crate) fn new(
        input_tx: mpsc::Sender<MeshInput>,
        view_rx: watch::Receiver<SessionView>,
    ) -> Self {
        Self { input_tx, view_rx }
    }

    /// Delivers an event from the signaling relay.
    pub async fn signal(&self, event: SignalEvent) -> Result<(), MeshError> {
        self.input_tx
            .send(MeshInput::Signal(event))
            .await
            .map_err(|_| self.gone())
    }

    /// Runs a local action and waits for its outcome. Malformed input is
    /// rejected here, before it reaches the session.
    pub async fn act(&self, action: LocalAction) -> Result<(), MeshError> {
        action.validate()?;

        let (reply, outcome) = oneshot::channel();
        self.input_tx
            .send(MeshInput::Local { action, reply })
            .await
            .map_err(|_| self.gone())?;

        outcome.await.map_err(|_| self.gone())?
    }

    /// Reports that the signaling relay disconnected. Ends the session.
    pub async fn channel_closed(&self) {
        let _ = self.input_tx.send(MeshInput::ChannelClosed).await;
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    fn gone(&self) -> MeshError {
        if self.view_rx.borrow().phase.is_ended() {
            MeshError::SessionEnded
        } else {
            MeshError::CoordinatorGone
        }
    }
}
