use crate::chat::ChatEntry;
use crate::link::{LinkState, RemoteMedia};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use watchparty_core::{Participant, ParticipantId, SharedPlayback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The local participant left.
    Left,
    /// The host removed the local participant.
    Evicted,
    /// The signaling channel went away.
    ChannelLost,
    /// Every handle to the coordinator was dropped.
    Shutdown,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::Left => "left the session",
            EndReason::Evicted => "removed by the host",
            EndReason::ChannelLost => "signaling connection lost",
            EndReason::Shutdown => "client shut down",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Waiting for the relay to assign the local id.
    #[default]
    Disconnected,
    Joined {
        local_id: ParticipantId,
    },
    /// Terminal. The coordinator ignores everything from here on.
    Ended(EndReason),
}

impl SessionPhase {
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionPhase::Ended(_))
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        match self {
            SessionPhase::Joined { local_id } => Some(local_id),
            _ => None,
        }
    }
}

/// Read-only state for the presentation layer, republished after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub local: Participant,
    /// Remote participants in the order they were first seen.
    pub peers: Arc<[Participant]>,
    pub links: BTreeMap<ParticipantId, LinkState>,
    pub streams: BTreeMap<ParticipantId, RemoteMedia>,
    pub playback: SharedPlayback,
    pub chat: Vec<ChatEntry>,
    /// Chat entries ever received. Tells new lines apart once `chat` is full.
    pub chat_total: u64,
}

impl SessionView {
    pub fn peer(&self, id: &ParticipantId) -> Option<&Participant> {
        self.peers.iter().find(|p| &p.id == id)
    }

    pub fn link_state(&self, id: &ParticipantId) -> Option<LinkState> {
        self.links.get(id).copied()
    }
}
