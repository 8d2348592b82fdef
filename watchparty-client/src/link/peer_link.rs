use crate::error::LinkError;
use crate::link::{LinkEvent, LocalTrack, RemoteMedia, TrackKind};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;
use watchparty_core::ParticipantId;

/// Generation id of one negotiation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub Uuid);

impl LinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// Sends the first offer.
    Initiator,
    /// Answers the remote offer.
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Negotiating,
    Connected,
    Closed,
}

/// Everything an engine needs to know about the link it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub link_id: LinkId,
    pub remote_id: ParticipantId,
    pub role: LinkRole,
}

impl LinkSpec {
    pub fn new(remote_id: ParticipantId, role: LinkRole) -> Self {
        Self {
            link_id: LinkId::new(),
            remote_id,
            role,
        }
    }
}

/// The external media-negotiation capability behind one link.
///
/// Calls must not block: engines queue work internally and report progress
/// through the [`LinkEvent`] sender they were created with.
pub trait NegotiationEngine: Send {
    /// Feeds a remote negotiation payload in.
    fn signal(&mut self, payload: String) -> Result<(), LinkError>;

    /// Attaches (`Some`) or detaches (`None`) the local track of `kind`.
    fn set_local_track(&mut self, kind: TrackKind, track: Option<LocalTrack>)
    -> Result<(), LinkError>;

    /// Releases every negotiation resource. Called at most once.
    fn destroy(&mut self);
}

pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        spec: &LinkSpec,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn NegotiationEngine>, LinkError>;
}

/// One negotiated connection to a single remote participant.
///
/// The role is fixed for the life of the link. Dropping a link that was not
/// closed destroys its engine.
pub struct PeerLink {
    id: LinkId,
    remote_id: ParticipantId,
    role: LinkRole,
    state: LinkState,
    media: Option<RemoteMedia>,
    engine: Box<dyn NegotiationEngine>,
}

impl PeerLink {
    pub fn open(
        spec: LinkSpec,
        factory: &dyn EngineFactory,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self, LinkError> {
        let engine = factory.create(&spec, events)?;

        Ok(Self {
            id: spec.link_id,
            remote_id: spec.remote_id,
            role: spec.role,
            state: LinkState::Negotiating,
            media: None,
            engine,
        })
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn media(&self) -> Option<&RemoteMedia> {
        self.media.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.state != LinkState::Closed
    }

    pub fn signal(&mut self, payload: String) -> Result<(), LinkError> {
        if !self.is_open() {
            return Err(LinkError::Closed(self.remote_id.clone()));
        }
        self.engine.signal(payload)
    }

    pub fn set_local_track(
        &mut self,
        kind: TrackKind,
        track: Option<LocalTrack>,
    ) -> Result<(), LinkError> {
        if !self.is_open() {
            return Err(LinkError::Closed(self.remote_id.clone()));
        }
        self.engine.set_local_track(kind, track)
    }

    /// Transport is up. Returns whether the state changed.
    pub fn mark_established(&mut self) -> bool {
        if self.state != LinkState::Negotiating {
            return false;
        }
        self.state = LinkState::Connected;
        true
    }

    /// Remote media arrived; merges it into the link's stream.
    pub fn attach_media(&mut self, media: RemoteMedia) {
        if !self.is_open() {
            return;
        }
        self.state = LinkState::Connected;
        match &mut self.media {
            Some(current) => current.merge(media),
            None => self.media = Some(media),
        }
    }

    pub fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        debug!("Closing link {} to {}", self.id, self.remote_id);
        self.state = LinkState::Closed;
        self.media = None;
        self.engine.destroy();
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerLink")
            .field("id", &self.id)
            .field("remote_id", &self.remote_id)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("media", &self.media)
            .finish()
    }
}
