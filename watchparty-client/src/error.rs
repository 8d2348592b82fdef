use crate::link::TrackKind;
use thiserror::Error;
use watchparty_core::{InvalidPeerId, ParticipantId};

/// Result of a local action, as reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("invalid peer id: {0}")]
    InvalidPeerId(#[from] InvalidPeerId),

    #[error("cannot connect to yourself")]
    SelfConnect,

    #[error("name must not be empty")]
    EmptyName,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("video url must not be empty")]
    EmptySource,

    #[error("only the host can do that")]
    NotHost,

    #[error("{0} is already host")]
    HostTaken(ParticipantId),

    #[error("cannot remove yourself")]
    SelfRemove,

    #[error("a media capture request is already pending")]
    CaptureInProgress,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("too many inputs queued before the session was assigned")]
    QueueFull,

    #[error("session has ended")]
    SessionEnded,

    #[error("coordinator is not running")]
    CoordinatorGone,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link to {0} is closed")]
    Closed(ParticipantId),

    #[error("negotiation engine stopped")]
    EngineGone,

    #[error("negotiation engine error: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture of {0:?} was denied")]
    Denied(TrackKind),

    #[error("no {0:?} device available")]
    Unavailable(TrackKind),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling channel closed")]
    Closed,

    #[error("failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),
}
