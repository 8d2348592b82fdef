use crate::link::{LinkId, RemoteMedia};
use watchparty_core::ParticipantId;

/// Events a negotiation engine reports back to the coordinator. Every event
/// names the link generation it came from so late events of a destroyed link
/// can be told apart from the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Local negotiation payload to relay to the remote side.
    Signal {
        remote: ParticipantId,
        link: LinkId,
        payload: String,
    },
    Established {
        remote: ParticipantId,
        link: LinkId,
    },
    MediaAttached {
        remote: ParticipantId,
        link: LinkId,
        media: RemoteMedia,
    },
    Failed {
        remote: ParticipantId,
        link: LinkId,
        reason: String,
    },
    Closed {
        remote: ParticipantId,
        link: LinkId,
    },
}

impl LinkEvent {
    pub fn source(&self) -> (&ParticipantId, LinkId) {
        match self {
            LinkEvent::Signal { remote, link, .. }
            | LinkEvent::Established { remote, link }
            | LinkEvent::MediaAttached { remote, link, .. }
            | LinkEvent::Failed { remote, link, .. }
            | LinkEvent::Closed { remote, link } => (remote, *link),
        }
    }
}
