use crate::error::MeshError;
use watchparty_core::{ParticipantId, PlaybackAction};

/// Something the local user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    SetName(String),
    /// Manually entered peer id, validated before anything is sent.
    ConnectPeer(String),
    SetCamera(bool),
    SetMicrophone(bool),
    SetHost(bool),
    ShareVideo(String),
    /// A transition the local player went through. Without a position the
    /// player's current time is used.
    Player {
        action: PlaybackAction,
        position_seconds: Option<f64>,
    },
    SendChat(String),
    RemovePeer(ParticipantId),
    Leave,
}

impl LocalAction {
    /// Checks what can be checked without session state.
    pub fn validate(&self) -> Result<(), MeshError> {
        match self {
            LocalAction::ConnectPeer(raw) => {
                ParticipantId::parse_manual(raw)?;
                Ok(())
            }
            LocalAction::SetName(name) if name.trim().is_empty() => Err(MeshError::EmptyName),
            LocalAction::SendChat(text) if text.trim().is_empty() => Err(MeshError::EmptyMessage),
            LocalAction::ShareVideo(url) if url.trim().is_empty() => Err(MeshError::EmptySource),
            _ => Ok(()),
        }
    }
}
