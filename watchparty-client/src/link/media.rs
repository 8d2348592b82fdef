use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub const ALL: [TrackKind; 2] = [TrackKind::Video, TrackKind::Audio];
}

/// A captured local track. Clones share the same underlying source, which is
/// how one capture is attached read-only to every link.
#[derive(Clone)]
pub struct LocalTrack {
    kind: TrackKind,
    source: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, source: Arc<TrackLocalStaticSample>) -> Self {
        Self { kind, source }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn source(&self) -> &Arc<TrackLocalStaticSample> {
        &self.source
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("id", &self.id())
            .finish()
    }
}

/// Tracks acquired from the local capture devices, at most one per kind.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    tracks: Vec<LocalTrack>,
}

impl LocalMedia {
    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.track(kind).is_some()
    }

    pub fn insert(&mut self, track: LocalTrack) {
        self.tracks.retain(|t| t.kind != track.kind);
        self.tracks.push(track);
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// Media a remote participant attached to its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    pub stream_id: String,
    pub tracks: Vec<TrackKind>,
}

impl RemoteMedia {
    pub fn single(stream_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            stream_id: stream_id.into(),
            tracks: vec![kind],
        }
    }

    pub fn merge(&mut self, other: RemoteMedia) {
        self.stream_id = other.stream_id;
        for kind in other.tracks {
            if !self.tracks.contains(&kind) {
                self.tracks.push(kind);
            }
        }
    }
}
