use crate::model::participant::{ParticipantId, ParticipantUpdate};
use crate::model::playback::PlaybackMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Membership entry as relayed by the signaling server. Only `id` is
/// mandatory; absent fields leave the known value alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "camOn", skip_serializing_if = "Option::is_none")]
    pub camera_enabled: Option<bool>,
    #[serde(default, alias = "micOn", skip_serializing_if = "Option::is_none")]
    pub mic_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
}

impl PeerRecord {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            camera_enabled: None,
            mic_enabled: None,
            is_host: None,
        }
    }
}

impl From<PeerRecord> for ParticipantUpdate {
    fn from(record: PeerRecord) -> Self {
        Self {
            id: record.id,
            display_name: record.name,
            camera_enabled: record.camera_enabled,
            microphone_enabled: record.mic_enabled,
            is_host: record.is_host,
        }
    }
}

/// Events delivered by the signaling relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalEvent {
    SessionAssigned {
        id: ParticipantId,
    },
    MembershipSnapshot(Vec<PeerRecord>),
    PeerJoined {
        id: ParticipantId,
        #[serde(default)]
        name: Option<String>,
    },
    PeerLeft {
        id: ParticipantId,
    },
    PeerUpdated(PeerRecord),
    /// Server announcement of the current host; `None` when nobody is.
    Host {
        #[serde(default)]
        id: Option<ParticipantId>,
    },
    SignalOffer {
        from: ParticipantId,
        payload: String,
        #[serde(default)]
        name: Option<String>,
    },
    SignalAnswer {
        from: ParticipantId,
        payload: String,
    },
    StatusUpdate {
        from: ParticipantId,
        #[serde(default, alias = "camOn")]
        camera_enabled: Option<bool>,
        #[serde(default, alias = "micOn")]
        mic_enabled: Option<bool>,
        #[serde(default)]
        is_host: Option<bool>,
    },
    PlaybackEvent {
        #[serde(default)]
        from: Option<ParticipantId>,
        #[serde(flatten)]
        message: PlaybackMessage,
    },
    ChatMessage {
        from: ParticipantId,
        #[serde(default)]
        name: Option<String>,
        text: String,
    },
    PeerRemoved {
        id: ParticipantId,
    },
}

/// Requests sent to the signaling relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalCommand {
    SetName {
        name: String,
    },
    GetHost,
    ConnectPeer {
        id: ParticipantId,
    },
    SignalOffer {
        to: ParticipantId,
        payload: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    SignalAnswer {
        to: ParticipantId,
        payload: String,
    },
    UpdateStatus {
        to: ParticipantId,
        camera_enabled: bool,
        mic_enabled: bool,
        is_host: bool,
    },
    SendVideo {
        to: ParticipantId,
        #[serde(flatten)]
        message: PlaybackMessage,
    },
    SendMessage {
        to: ParticipantId,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    RemovePeer {
        id: ParticipantId,
    },
    Leave,
}

impl SignalCommand {
    /// The participant a relayed command is addressed to, if any.
    pub fn recipient(&self) -> Option<&ParticipantId> {
        match self {
            SignalCommand::SignalOffer { to, .. }
            | SignalCommand::SignalAnswer { to, .. }
            | SignalCommand::UpdateStatus { to, .. }
            | SignalCommand::SendVideo { to, .. }
            | SignalCommand::SendMessage { to, .. } => Some(to),
            _ => None,
        }
    }
}
