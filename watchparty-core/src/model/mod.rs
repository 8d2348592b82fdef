mod participant;
mod playback;
mod signaling;

pub use participant::{InvalidPeerId, MANUAL_ID_LEN, Participant, ParticipantId, ParticipantUpdate};
pub use playback::{PlaybackAction, PlaybackMessage, SharedPlayback};
pub use signaling::{IceServerConfig, PeerRecord, SignalCommand, SignalEvent};
