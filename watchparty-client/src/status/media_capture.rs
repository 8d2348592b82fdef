use crate::error::CaptureError;
use crate::link::{LocalTrack, TrackKind};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Access to the local camera and microphone.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Acquires a track of `kind`. May wait on the user granting permission.
    async fn acquire(&self, kind: TrackKind) -> Result<LocalTrack, CaptureError>;
}

/// Produces sample tracks that never carry frames. Useful where no capture
/// device exists but peers should still see the track.
pub struct SyntheticCapture {
    stream_id: String,
}

impl SyntheticCapture {
    pub fn new() -> Self {
        Self {
            stream_id: format!("watchparty-{}", Uuid::new_v4()),
        }
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaCapture for SyntheticCapture {
    async fn acquire(&self, kind: TrackKind) -> Result<LocalTrack, CaptureError> {
        let (mime_type, id) = match kind {
            TrackKind::Video => (MIME_TYPE_VP8, "video"),
            TrackKind::Audio => (MIME_TYPE_OPUS, "audio"),
        };

        let source = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.to_owned(),
            self.stream_id.clone(),
        );
        info!("Synthetic {:?} track ready", kind);

        Ok(LocalTrack::new(kind, Arc::new(source)))
    }
}

/// Refuses every request, as a user declining the permission prompt would.
pub struct DeniedCapture;

#[async_trait]
impl MediaCapture for DeniedCapture {
    async fn acquire(&self, kind: TrackKind) -> Result<LocalTrack, CaptureError> {
        Err(CaptureError::Denied(kind))
    }
}
