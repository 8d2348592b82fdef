use crate::error::{CaptureError, MeshError, SignalingError};
use crate::link::{LocalMedia, LocalTrack, TrackKind};
use crate::registry::{PeerRegistry, Upsert};
use crate::signaling::SignalingOutput;
use crate::status::MediaCapture;
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchparty_core::{Participant, ParticipantId, ParticipantUpdate, SignalCommand};

/// What the coordinator has to do after a capability request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityPlan {
    /// Already in the requested state.
    Unchanged,
    /// Local status changed; tracks and peers need to hear about it.
    Applied,
    /// A device has to be captured first; the change lands when it finishes.
    Capture,
}

/// Owns the local participant record and the captured devices.
///
/// Local status changes only through local actions (and the relay's host
/// announcement). Remote status is folded into the registry, never here.
pub struct StatusBroadcaster {
    local: Participant,
    media: LocalMedia,
    capture: Arc<dyn MediaCapture>,
    pending_capture: Option<TrackKind>,
}

impl StatusBroadcaster {
    pub fn new(capture: Arc<dyn MediaCapture>) -> Self {
        Self {
            local: Participant::new(ParticipantId::default()),
            media: LocalMedia::default(),
            capture,
            pending_capture: None,
        }
    }

    pub fn local(&self) -> &Participant {
        &self.local
    }

    pub fn assign_id(&mut self, id: ParticipantId) {
        self.local.id = id;
    }

    /// Stores a trimmed, non-empty display name and returns it.
    pub fn set_name(&mut self, name: &str) -> Result<String, MeshError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MeshError::EmptyName);
        }
        self.local.display_name = Some(name.to_owned());
        Ok(name.to_owned())
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.local.camera_enabled,
            TrackKind::Audio => self.local.microphone_enabled,
        }
    }

    pub fn is_host(&self) -> bool {
        self.local.is_host
    }

    /// Returns whether the flag changed.
    pub fn set_host(&mut self, host: bool) -> bool {
        let changed = self.local.is_host != host;
        self.local.is_host = host;
        changed
    }

    /// Is the local status anything other than the all-off default?
    pub fn is_announced(&self) -> bool {
        self.local.camera_enabled || self.local.microphone_enabled || self.local.is_host
    }

    pub fn request(&mut self, kind: TrackKind, enabled: bool) -> Result<CapabilityPlan, MeshError> {
        if self.pending_capture.is_some() {
            return Err(MeshError::CaptureInProgress);
        }
        if self.is_enabled(kind) == enabled {
            return Ok(CapabilityPlan::Unchanged);
        }
        if enabled && !self.media.has(kind) {
            debug!("Capturing {:?} before enabling it", kind);
            self.pending_capture = Some(kind);
            return Ok(CapabilityPlan::Capture);
        }

        self.set_enabled(kind, enabled);
        Ok(CapabilityPlan::Applied)
    }

    pub fn capture_source(&self) -> Arc<dyn MediaCapture> {
        self.capture.clone()
    }

    /// Lands a finished capture. A denied capture leaves the capability off.
    /// Returns whether the capability is now on.
    pub fn finish_capture(
        &mut self,
        kind: TrackKind,
        result: Result<LocalTrack, CaptureError>,
    ) -> bool {
        if self.pending_capture.take() != Some(kind) {
            debug!("Capture of {:?} finished without a pending request", kind);
        }

        match result {
            Ok(track) => {
                info!("Captured local {:?} track {}", kind, track.id());
                self.media.insert(track);
                self.set_enabled(kind, true);
                true
            }
            Err(e) => {
                warn!("Local capture failed: {}", e);
                self.set_enabled(kind, false);
                false
            }
        }
    }

    /// The track peers should receive for `kind`, if that capability is on.
    pub fn active_track(&self, kind: TrackKind) -> Option<LocalTrack> {
        if !self.is_enabled(kind) {
            return None;
        }
        self.media.track(kind).cloned()
    }

    pub fn status_for(&self, to: ParticipantId) -> SignalCommand {
        SignalCommand::UpdateStatus {
            to,
            camera_enabled: self.local.camera_enabled,
            mic_enabled: self.local.microphone_enabled,
            is_host: self.local.is_host,
        }
    }

    /// Sends the local status to every recipient.
    pub async fn broadcast(
        &self,
        signaling: &dyn SignalingOutput,
        recipients: &[ParticipantId],
    ) -> Result<(), SignalingError> {
        for to in recipients {
            signaling.send(self.status_for(to.clone())).await?;
        }
        Ok(())
    }

    /// Merges a remote status into the registry. Unknown senders are
    /// registered. A host claim is dropped while the local side is host.
    pub fn fold_remote(&self, registry: &mut PeerRegistry, mut update: ParticipantUpdate) -> Upsert {
        if update.is_host == Some(true) && self.local.is_host {
            warn!("Ignoring host claim from {} while local is host", update.id);
            update.is_host = None;
        }
        registry.upsert_participant(&update)
    }

    /// Drops captured devices and resets capabilities.
    pub fn release(&mut self) {
        self.media.clear();
        self.pending_capture = None;
        self.local.camera_enabled = false;
        self.local.microphone_enabled = false;
        self.local.is_host = false;
    }

    fn set_enabled(&mut self, kind: TrackKind, enabled: bool) {
        match kind {
            TrackKind::Video => self.local.camera_enabled = enabled,
            TrackKind::Audio => self.local.microphone_enabled = enabled,
        }
    }
}
