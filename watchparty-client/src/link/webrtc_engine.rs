use crate::error::LinkError;
use crate::link::{
    EngineFactory, LinkConfig, LinkEvent, LinkRole, LinkSpec, LocalTrack, NegotiationEngine,
    RemoteMedia, TrackKind,
};
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Builds [`WebRtcEngine`]s sharing one WebRTC API instance.
pub struct WebRtcEngineFactory {
    api: Arc<API>,
    config: LinkConfig,
}

impl WebRtcEngineFactory {
    pub fn new(config: LinkConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api: Arc::new(api),
            config,
        })
    }
}

impl EngineFactory for WebRtcEngineFactory {
    fn create(
        &self,
        spec: &LinkSpec,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn NegotiationEngine>, LinkError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| LinkError::Engine(e.to_string()))?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        runtime.spawn(drive(
            self.api.clone(),
            self.config.clone(),
            spec.clone(),
            commands_rx,
            events,
        ));

        Ok(Box::new(WebRtcEngine {
            commands: commands_tx,
        }))
    }
}

enum EngineCommand {
    Signal(String),
    SetTrack(TrackKind, Option<LocalTrack>),
    Close,
}

/// Handle to a peer connection driven by its own task. Descriptions are
/// exchanged whole (no trickle): each payload is a JSON session description
/// sent once ICE gathering finished or timed out.
pub struct WebRtcEngine {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl NegotiationEngine for WebRtcEngine {
    fn signal(&mut self, payload: String) -> Result<(), LinkError> {
        self.commands
            .send(EngineCommand::Signal(payload))
            .map_err(|_| LinkError::EngineGone)
    }

    fn set_local_track(
        &mut self,
        kind: TrackKind,
        track: Option<LocalTrack>,
    ) -> Result<(), LinkError> {
        self.commands
            .send(EngineCommand::SetTrack(kind, track))
            .map_err(|_| LinkError::EngineGone)
    }

    fn destroy(&mut self) {
        let _ = self.commands.send(EngineCommand::Close);
    }
}

async fn drive(
    api: Arc<API>,
    config: LinkConfig,
    spec: LinkSpec,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    events: mpsc::UnboundedSender<LinkEvent>,
) {
    let fail = |reason: String| {
        let _ = events.send(LinkEvent::Failed {
            remote: spec.remote_id.clone(),
            link: spec.link_id,
            reason,
        });
    };

    let mut driver = match Driver::open(&api, &config, &spec, events.clone()).await {
        Ok(driver) => driver,
        Err(e) => {
            warn!("Failed to open peer connection to {}: {:#}", spec.remote_id, e);
            fail(format!("{e:#}"));
            return;
        }
    };

    if spec.role == LinkRole::Initiator {
        if let Err(e) = driver.send_offer().await {
            warn!("Failed to create offer for {}: {:#}", spec.remote_id, e);
            fail(format!("{e:#}"));
            driver.shutdown().await;
            return;
        }
    }

    while let Some(command) = commands.recv().await {
        let result = match command {
            EngineCommand::Signal(payload) => driver.accept(payload).await,
            EngineCommand::SetTrack(kind, track) => driver.set_track(kind, track).await,
            EngineCommand::Close => break,
        };

        if let Err(e) = result {
            warn!("Negotiation with {} failed: {:#}", spec.remote_id, e);
            fail(format!("{e:#}"));
            break;
        }
    }

    driver.shutdown().await;
}

struct Driver {
    spec: LinkSpec,
    config: LinkConfig,
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::UnboundedSender<LinkEvent>,
    senders: HashMap<TrackKind, Arc<RTCRtpSender>>,
    /// Silent tracks the senders start with. Swapped back in when a capture
    /// is detached, since a sender with no track cannot take another one.
    idle: HashMap<TrackKind, Arc<dyn TrackLocal + Send + Sync>>,
}

impl Driver {
    async fn open(
        api: &API,
        config: &LinkConfig,
        spec: &LinkSpec,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self> {
        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        let state_spec = spec.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let remote = state_spec.remote_id.clone();
                let link = state_spec.link_id;

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", remote, s);
                    let event = match s {
                        RTCPeerConnectionState::Connected => LinkEvent::Established { remote, link },
                        RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected => {
                            LinkEvent::Failed {
                                remote,
                                link,
                                reason: format!("peer connection {:?}", s),
                            }
                        }
                        RTCPeerConnectionState::Closed => LinkEvent::Closed { remote, link },
                        _ => return,
                    };
                    let _ = tx.send(event);
                })
            },
        ));

        let track_tx = events.clone();
        let track_spec = spec.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let tx = track_tx.clone();
            let remote = track_spec.remote_id.clone();
            let link = track_spec.link_id;

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    _ => return,
                };
                debug!("Remote {:?} track from {}", kind, remote);
                let media = RemoteMedia::single(track.stream_id().to_string(), kind);
                let _ = tx.send(LinkEvent::MediaAttached {
                    remote,
                    link,
                    media,
                });
            })
        }));

        // Both roles negotiate both kinds as sendrecv, so either side can
        // attach tracks later without another offer. A responder's
        // transceivers are matched to the offer's m-lines by kind.
        let mut senders = HashMap::new();
        let mut idle = HashMap::new();
        for (kind, codec) in [
            (TrackKind::Video, RTPCodecType::Video),
            (TrackKind::Audio, RTPCodecType::Audio),
        ] {
            let transceiver = peer_connection
                .add_transceiver_from_kind(
                    codec,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Sendrecv,
                        send_encodings: vec![],
                    }),
                )
                .await?;
            let sender = transceiver.sender().await;
            if let Some(track) = sender.track().await {
                idle.insert(kind, track);
            }
            senders.insert(kind, sender);
        }

        Ok(Self {
            spec: spec.clone(),
            config: config.clone(),
            peer_connection,
            events,
            senders,
            idle,
        })
    }

    async fn send_offer(&mut self) -> Result<()> {
        let offer = self.peer_connection.create_offer(None).await?;
        let payload = self.describe_locally(offer).await?;
        self.emit_signal(payload);
        Ok(())
    }

    async fn accept(&mut self, payload: String) -> Result<()> {
        let description: RTCSessionDescription =
            serde_json::from_str(&payload).context("Malformed session description")?;

        match description.sdp_type {
            RTCSdpType::Offer => {
                self.peer_connection
                    .set_remote_description(description)
                    .await?;

                let answer = self.peer_connection.create_answer(None).await?;
                let payload = self.describe_locally(answer).await?;
                self.emit_signal(payload);
            }
            RTCSdpType::Answer => {
                self.peer_connection
                    .set_remote_description(description)
                    .await?;
            }
            other => bail!("Unexpected session description type {:?}", other),
        }

        Ok(())
    }

    async fn set_track(&mut self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()> {
        let sender = self
            .senders
            .get(&kind)
            .with_context(|| format!("No {:?} sender on link to {}", kind, self.spec.remote_id))?;
        let source = match track {
            Some(track) => track.source().clone() as Arc<dyn TrackLocal + Send + Sync>,
            None => self.idle.get(&kind).cloned().with_context(|| {
                format!("No idle {:?} track on link to {}", kind, self.spec.remote_id)
            })?,
        };

        sender.replace_track(Some(source)).await?;
        Ok(())
    }

    async fn describe_locally(&self, description: RTCSessionDescription) -> Result<String> {
        let mut gathered = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection
            .set_local_description(description)
            .await?;

        if tokio::time::timeout(self.config.gathering_timeout, gathered.recv())
            .await
            .is_err()
        {
            debug!(
                "ICE gathering for {} timed out, sending what we have",
                self.spec.remote_id
            );
        }

        let local = self
            .peer_connection
            .local_description()
            .await
            .context("Local description missing after negotiation")?;
        Ok(serde_json::to_string(&local)?)
    }

    fn emit_signal(&self, payload: String) {
        let _ = self.events.send(LinkEvent::Signal {
            remote: self.spec.remote_id.clone(),
            link: self.spec.link_id,
            payload,
        });
    }

    async fn shutdown(&self) {
        if let Err(e) = self.peer_connection.close().await {
            debug!("Error closing peer connection to {}: {}", self.spec.remote_id, e);
        }
    }
}
