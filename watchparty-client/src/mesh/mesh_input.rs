use crate::error::{CaptureError, MeshError};
use crate::link::{LocalTrack, TrackKind};
use crate::mesh::LocalAction;
use tokio::sync::oneshot;
use watchparty_core::SignalEvent;

/// Everything that reaches the coordinator from outside its task.
#[derive(Debug)]
pub enum MeshInput {
    /// An event delivered by the signaling relay.
    Signal(SignalEvent),
    Local {
        action: LocalAction,
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    /// The signaling relay went away.
    ChannelClosed,
}

impl MeshInput {
    /// Drops the input, telling the caller why if it is waiting.
    pub fn reject(self, error: MeshError) {
        if let MeshInput::Local { reply, .. } = self {
            let _ = reply.send(Err(error));
        }
    }
}

/// A finished capture, handed back to the loop that requested it.
#[derive(Debug)]
pub(crate) struct CaptureOutcome {
    pub kind: TrackKind,
    pub result: Result<LocalTrack, CaptureError>,
}
