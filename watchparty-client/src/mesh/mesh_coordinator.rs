use crate::chat::{ChatEntry, ChatLog};
use crate::config::ClientConfig;
use crate::error::{MeshError, SignalingError};
use crate::link::{EngineFactory, LinkEvent, LinkRole, LinkSpec, PeerLink, TrackKind};
use crate::mesh::{CaptureOutcome, LocalAction, MeshHandle, MeshInput, elect};
use crate::playback::{PlaybackSync, Player};
use crate::registry::{PeerRegistry, Upsert};
use crate::signaling::SignalingOutput;
use crate::status::{CapabilityPlan, MediaCapture, StatusBroadcaster};
use crate::view::{EndReason, SessionPhase, SessionView};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use watchparty_core::{
    ParticipantId, ParticipantUpdate, PeerRecord, PlaybackMessage, SignalCommand, SignalEvent,
};

/// The collaborators a session is wired to.
pub struct MeshServices {
    pub signaling: Arc<dyn SignalingOutput>,
    pub engines: Arc<dyn EngineFactory>,
    pub capture: Arc<dyn MediaCapture>,
    pub player: Box<dyn Player>,
}

/// Whether a local action is answered now or once a capture finishes.
enum Completion {
    Done,
    AfterCapture,
}

/// Owns one session: membership, links, local status, playback and chat.
///
/// Runs as a single task. Relay events, local actions, link events and
/// capture results are all handled one at a time on that task, so no state
/// is shared. The session is not restartable; a new one needs a new
/// coordinator.
pub struct MeshCoordinator {
    config: ClientConfig,
    phase: SessionPhase,
    registry: PeerRegistry,
    status: StatusBroadcaster,
    playback: PlaybackSync,
    chat: ChatLog,
    signaling: Arc<dyn SignalingOutput>,
    engines: Arc<dyn EngineFactory>,
    input_rx: mpsc::Receiver<MeshInput>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    capture_rx: mpsc::UnboundedReceiver<CaptureOutcome>,
    capture_tx: mpsc::UnboundedSender<CaptureOutcome>,
    capture_reply: Option<oneshot::Sender<Result<(), MeshError>>>,
    view_tx: watch::Sender<SessionView>,
    /// Inputs that arrived before the relay assigned the local id.
    pending: VecDeque<MeshInput>,
    channel_lost: bool,
}

impl MeshCoordinator {
    pub fn new(config: ClientConfig, services: MeshServices) -> (Self, MeshHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(SessionView::default());

        let coordinator = Self {
            registry: PeerRegistry::new(),
            status: StatusBroadcaster::new(services.capture),
            playback: PlaybackSync::new(
                services.player,
                config.echo_window(),
                config.host_gated_sources,
            ),
            chat: ChatLog::new(config.chat_history_limit),
            config,
            phase: SessionPhase::Disconnected,
            signaling: services.signaling,
            engines: services.engines,
            input_rx,
            link_rx,
            link_tx,
            capture_rx,
            capture_tx,
            capture_reply: None,
            view_tx,
            pending: VecDeque::new(),
            channel_lost: false,
        };

        (coordinator, MeshHandle::new(input_tx, view_rx))
    }

    /// Starts a coordinator on the current runtime.
    pub fn spawn(config: ClientConfig, services: MeshServices) -> MeshHandle {
        let (coordinator, handle) = Self::new(config, services);
        tokio::spawn(coordinator.run());
        handle
    }

    pub async fn run(mut self) {
        info!("Mesh coordinator started");

        loop {
            tokio::select! {
                input = self.input_rx.recv() => {
                    match input {
                        Some(input) => self.handle_input(input).await,
                        None => {
                            info!("All handles dropped. Shutting down session.");
                            self.end_session(EndReason::Shutdown).await;
                        }
                    }
                }

                Some(event) = self.link_rx.recv() => {
                    self.handle_link_event(event).await;
                }

                Some(outcome) = self.capture_rx.recv() => {
                    self.handle_capture(outcome).await;
                }
            }

            if self.channel_lost {
                self.end_session(EndReason::ChannelLost).await;
            }
            self.publish();

            if self.phase.is_ended() {
                break;
            }
        }

        info!("Mesh coordinator finished");
    }

    async fn handle_input(&mut self, input: MeshInput) {
        match self.phase {
            SessionPhase::Ended(_) => input.reject(MeshError::SessionEnded),
            SessionPhase::Disconnected => match input {
                MeshInput::Signal(SignalEvent::SessionAssigned { id }) => self.assign(id).await,
                MeshInput::ChannelClosed => {
                    warn!("Signaling channel closed before the session was assigned");
                    self.end_session(EndReason::ChannelLost).await;
                }
                other => self.enqueue(other),
            },
            SessionPhase::Joined { .. } => self.dispatch(input).await,
        }
    }

    fn enqueue(&mut self, input: MeshInput) {
        if self.pending.len() >= self.config.pending_input_limit {
            warn!("Dropping input received before session assignment: queue full");
            input.reject(MeshError::QueueFull);
            return;
        }
        debug!("Queued input until the session is assigned");
        self.pending.push_back(input);
    }

    async fn assign(&mut self, id: ParticipantId) {
        info!("Session assigned id {}", id);
        self.status.assign_id(id.clone());
        self.phase = SessionPhase::Joined { local_id: id };
        self.send(SignalCommand::GetHost).await;

        while let Some(input) = self.pending.pop_front() {
            if self.phase.is_ended() || self.channel_lost {
                input.reject(MeshError::SessionEnded);
                continue;
            }
            self.dispatch(input).await;
        }
    }

    async fn dispatch(&mut self, input: MeshInput) {
        match input {
            MeshInput::Signal(event) => self.handle_signal(event).await,
            MeshInput::Local { action, reply } => {
                let result = self.handle_action(action).await;
                // Callers see the outcome reflected in the view once they hear back.
                self.publish();
                match result {
                    Ok(Completion::AfterCapture) => self.capture_reply = Some(reply),
                    Ok(Completion::Done) if self.channel_lost => {
                        let _ = reply.send(Err(MeshError::SessionEnded));
                    }
                    Ok(Completion::Done) => {
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        debug!("Local action rejected: {}", e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            MeshInput::ChannelClosed => {
                warn!("Signaling channel closed");
                self.end_session(EndReason::ChannelLost).await;
            }
        }
    }

    async fn handle_signal(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::SessionAssigned { id } => {
                if id != self.local_id() {
                    warn!("Ignoring reassignment to {} during a live session", id);
                }
            }

            SignalEvent::MembershipSnapshot(records) => self.reconcile(records).await,

            SignalEvent::PeerJoined { id, name } => {
                let mut record = PeerRecord::new(id);
                record.name = name;
                self.admit_record(record).await;
            }

            SignalEvent::PeerUpdated(record) => self.admit_record(record).await,

            SignalEvent::PeerLeft { id } => self.depart(&id),

            SignalEvent::Host { id } => self.apply_host(id).await,

            SignalEvent::SignalOffer {
                from,
                payload,
                name,
            } => self.accept_offer(from, payload, name).await,

            SignalEvent::SignalAnswer { from, payload } => self.accept_answer(from, payload),

            SignalEvent::StatusUpdate {
                from,
                camera_enabled,
                mic_enabled,
                is_host,
            } => {
                if self.is_local(&from) {
                    return;
                }
                debug!("Status update from {}", from);
                self.implicit_join(ParticipantUpdate {
                    id: from,
                    display_name: None,
                    camera_enabled,
                    microphone_enabled: mic_enabled,
                    is_host,
                })
                .await;
            }

            SignalEvent::PlaybackEvent { from, message } => {
                if from.as_ref().is_some_and(|id| self.is_local(id)) {
                    return;
                }
                if let Some(id) = &from {
                    self.implicit_join(ParticipantUpdate::new(id.clone())).await;
                }

                // The relay may omit the sender; then it is trusted as long as
                // some remote participant holds host.
                let sender_is_host = match &from {
                    Some(id) => self.registry.host() == Some(id),
                    None => self.registry.host().is_some(),
                };
                self.playback.apply_remote(&message, sender_is_host);
            }

            SignalEvent::ChatMessage { from, name, text } => {
                if self.is_local(&from) {
                    return;
                }

                let mut update = ParticipantUpdate::new(from.clone());
                if let Some(name) = &name {
                    update = update.with_name(name.clone());
                }
                self.implicit_join(update).await;

                let name = self
                    .registry
                    .participant(&from)
                    .map(|p| p.label().to_owned())
                    .unwrap_or_else(|| from.to_string());
                self.chat.push(ChatEntry {
                    from,
                    name,
                    text,
                    local: false,
                });
            }

            SignalEvent::PeerRemoved { id } => {
                if self.is_local(&id) {
                    info!("Removed from the session by the host");
                    self.end_session(EndReason::Evicted).await;
                } else {
                    self.depart(&id);
                }
            }
        }
    }

    /// Brings the registry in line with a full membership list: ids missing
    /// from it depart, the rest are admitted. Replaying a list is a no-op.
    async fn reconcile(&mut self, records: Vec<PeerRecord>) {
        let present: HashSet<ParticipantId> = records.iter().map(|r| r.id.clone()).collect();

        for id in self.registry.ids() {
            if !present.contains(&id) {
                self.depart(&id);
            }
        }

        for record in records {
            self.admit_record(record).await;
        }
    }

    async fn admit_record(&mut self, record: PeerRecord) {
        if self.is_local(&record.id) {
            if let Some(host) = record.is_host {
                self.set_local_host(host).await;
            }
            return;
        }

        let id = record.id.clone();
        self.observe(record.into()).await;
        self.ensure_link(&id);
    }

    /// Registers a participant that made itself known outside of membership
    /// events. A link is only started for participants not seen before.
    async fn implicit_join(&mut self, update: ParticipantUpdate) {
        let id = update.id.clone();
        if self.observe(update).await {
            self.ensure_link(&id);
        }
    }

    /// Folds the update in and greets new participants. Returns whether the
    /// participant was new.
    async fn observe(&mut self, update: ParticipantUpdate) -> bool {
        let id = update.id.clone();
        if self.status.fold_remote(&mut self.registry, update) != Upsert::Inserted {
            return false;
        }

        info!("Participant {} joined", id);
        if self.status.is_announced() {
            let command = self.status.status_for(id.clone());
            self.send(command).await;
        }
        if self.status.is_host() {
            if let Some(message) = self.playback.catch_up() {
                debug!("Catching {} up on shared playback", id);
                self.send(SignalCommand::SendVideo { to: id, message }).await;
            }
        }
        true
    }

    fn depart(&mut self, id: &ParticipantId) {
        if self.registry.remove_participant(id).is_some() {
            info!("Participant {} left", id);
        }
    }

    /// Starts negotiating with `id` if it has no link and the local side is
    /// elected to offer.
    fn ensure_link(&mut self, id: &ParticipantId) {
        if self.registry.get_link(id).is_some() {
            return;
        }

        match elect(&self.local_id(), id) {
            Some(LinkRole::Initiator) => self.open_link(id.clone(), LinkRole::Initiator, None),
            Some(LinkRole::Responder) => debug!("Waiting for {} to offer", id),
            None => warn!("Participant {} shares the local id", id),
        }
    }

    fn open_link(&mut self, remote: ParticipantId, role: LinkRole, offer: Option<String>) {
        let spec = LinkSpec::new(remote.clone(), role);
        let mut link = match PeerLink::open(spec, self.engines.as_ref(), self.link_tx.clone()) {
            Ok(link) => link,
            Err(e) => {
                warn!("Failed to open link to {}: {}", remote, e);
                return;
            }
        };

        for kind in TrackKind::ALL {
            if let Some(track) = self.status.active_track(kind) {
                if let Err(e) = link.set_local_track(kind, Some(track)) {
                    warn!("Failed to attach {:?} to link {}: {}", kind, link.id(), e);
                }
            }
        }

        if let Some(offer) = offer {
            if let Err(e) = link.signal(offer) {
                warn!("Link {} refused the offer from {}: {}", link.id(), remote, e);
                return;
            }
        }

        let link_id = link.id();
        if self.registry.set_link(link) {
            info!("Opened {:?} link {} to {}", role, link_id, remote);
        }
    }

    async fn accept_offer(&mut self, from: ParticipantId, payload: String, name: Option<String>) {
        if self.is_local(&from) {
            return;
        }

        let mut update = ParticipantUpdate::new(from.clone());
        if let Some(name) = name {
            update = update.with_name(name);
        }
        self.observe(update).await;

        match self.registry.get_link_mut(&from) {
            Some(link) => {
                debug!("Forwarding offer from {} into link {}", from, link.id());
                if let Err(e) = link.signal(payload) {
                    warn!("Failed to forward offer from {}: {}", from, e);
                }
            }
            None => self.open_link(from, LinkRole::Responder, Some(payload)),
        }
    }

    fn accept_answer(&mut self, from: ParticipantId, payload: String) {
        let Some(link) = self.registry.get_link_mut(&from) else {
            warn!("Dropping answer from {} without a link", from);
            return;
        };
        if let Err(e) = link.signal(payload) {
            warn!("Failed to forward answer from {}: {}", from, e);
        }
    }

    /// The relay's word on who is host. Applied to the local status like a
    /// local change when it concerns the local participant.
    async fn apply_host(&mut self, host: Option<ParticipantId>) {
        match host {
            Some(id) if self.is_local(&id) => {
                self.registry.assign_host(None);
                self.set_local_host(true).await;
            }
            Some(id) => {
                self.set_local_host(false).await;
                self.implicit_join(ParticipantUpdate::new(id.clone())).await;
                self.registry.assign_host(Some(&id));
            }
            None => {
                self.registry.assign_host(None);
                self.set_local_host(false).await;
            }
        }
    }

    async fn set_local_host(&mut self, host: bool) {
        if self.status.set_host(host) {
            info!("Local host flag now {}", host);
            self.broadcast_status().await;
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        let (remote, link_id) = {
            let (remote, link_id) = event.source();
            (remote.clone(), link_id)
        };

        let Some(link) = self.registry.get_link_mut(&remote) else {
            debug!("Ignoring event from link {} to departed {}", link_id, remote);
            return;
        };
        if link.id() != link_id {
            debug!("Ignoring event from stale link {} to {}", link_id, remote);
            return;
        }

        match event {
            LinkEvent::Signal { payload, .. } => {
                let command = match link.role() {
                    LinkRole::Initiator => SignalCommand::SignalOffer {
                        to: remote,
                        payload,
                        name: self.status.local().display_name.clone(),
                    },
                    LinkRole::Responder => SignalCommand::SignalAnswer {
                        to: remote,
                        payload,
                    },
                };
                self.send(command).await;
            }
            LinkEvent::Established { .. } => {
                if link.mark_established() {
                    info!("Link to {} connected", remote);
                }
            }
            LinkEvent::MediaAttached { media, .. } => {
                debug!("Media {:?} attached from {}", media.tracks, remote);
                link.attach_media(media);
            }
            LinkEvent::Failed { reason, .. } => {
                warn!("Link to {} failed: {}", remote, reason);
                self.registry.clear_link(&remote);
            }
            LinkEvent::Closed { .. } => {
                info!("Link to {} closed", remote);
                self.registry.clear_link(&remote);
            }
        }
    }

    async fn handle_capture(&mut self, outcome: CaptureOutcome) {
        let CaptureOutcome { kind, result } = outcome;
        let denied = result.as_ref().err().cloned();

        if self.status.finish_capture(kind, result) {
            self.attach_track(kind);
        }
        self.broadcast_status().await;
        self.publish();

        if let Some(reply) = self.capture_reply.take() {
            let _ = reply.send(match denied {
                Some(e) => Err(e.into()),
                None => Ok(()),
            });
        }
    }

    async fn handle_action(&mut self, action: LocalAction) -> Result<Completion, MeshError> {
        match action {
            LocalAction::SetName(name) => {
                let name = self.status.set_name(&name)?;
                self.send(SignalCommand::SetName { name }).await;
            }

            LocalAction::ConnectPeer(raw) => {
                let id = ParticipantId::parse_manual(&raw)?;
                if self.is_local(&id) {
                    return Err(MeshError::SelfConnect);
                }
                info!("Requesting connection to {}", id);
                self.send(SignalCommand::ConnectPeer { id }).await;
            }

            LocalAction::SetCamera(enabled) => {
                return self.set_capability(TrackKind::Video, enabled).await;
            }

            LocalAction::SetMicrophone(enabled) => {
                return self.set_capability(TrackKind::Audio, enabled).await;
            }

            LocalAction::SetHost(host) => {
                if host {
                    if let Some(current) = self.registry.host() {
                        return Err(MeshError::HostTaken(current.clone()));
                    }
                }
                self.set_local_host(host).await;
            }

            LocalAction::ShareVideo(url) => {
                let message = self.playback.share_source(&url, self.status.is_host())?;
                self.relay_playback(message).await;
            }

            LocalAction::Player {
                action,
                position_seconds,
            } => {
                if let Some(message) = self.playback.local_transition(action, position_seconds) {
                    self.relay_playback(message).await;
                }
            }

            LocalAction::SendChat(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(MeshError::EmptyMessage);
                }

                let local = self.status.local().clone();
                for to in self.registry.ids() {
                    self.send(SignalCommand::SendMessage {
                        to,
                        text: text.to_owned(),
                        name: local.display_name.clone(),
                    })
                    .await;
                }
                self.chat.push(ChatEntry {
                    name: local.label().to_owned(),
                    from: local.id,
                    text: text.to_owned(),
                    local: true,
                });
            }

            LocalAction::RemovePeer(id) => {
                if !self.status.is_host() {
                    return Err(MeshError::NotHost);
                }
                if self.is_local(&id) {
                    return Err(MeshError::SelfRemove);
                }
                info!("Removing {} from the session", id);
                self.send(SignalCommand::RemovePeer { id }).await;
            }

            LocalAction::Leave => {
                info!("Leaving session");
                self.send(SignalCommand::Leave).await;
                self.end_session(EndReason::Left).await;
            }
        }

        Ok(Completion::Done)
    }

    async fn set_capability(
        &mut self,
        kind: TrackKind,
        enabled: bool,
    ) -> Result<Completion, MeshError> {
        match self.status.request(kind, enabled)? {
            CapabilityPlan::Unchanged => Ok(Completion::Done),
            CapabilityPlan::Applied => {
                self.attach_track(kind);
                self.broadcast_status().await;
                Ok(Completion::Done)
            }
            CapabilityPlan::Capture => {
                let capture = self.status.capture_source();
                let capture_tx = self.capture_tx.clone();
                tokio::spawn(async move {
                    let result = capture.acquire(kind).await;
                    let _ = capture_tx.send(CaptureOutcome { kind, result });
                });
                Ok(Completion::AfterCapture)
            }
        }
    }

    /// Attaches the current track of `kind` to every link, or detaches it
    /// when that capability is off. Links stay up either way.
    fn attach_track(&mut self, kind: TrackKind) {
        let track = self.status.active_track(kind);
        for link in self.registry.links_mut() {
            if let Err(e) = link.set_local_track(kind, track.clone()) {
                warn!("Failed to update {:?} on link {}: {}", kind, link.id(), e);
            }
        }
    }

    async fn relay_playback(&mut self, message: PlaybackMessage) {
        for to in self.registry.ids() {
            self.send(SignalCommand::SendVideo {
                to,
                message: message.clone(),
            })
            .await;
        }
    }

    async fn broadcast_status(&mut self) {
        if self.channel_lost {
            return;
        }
        let recipients = self.registry.ids();
        let result = self
            .status
            .broadcast(self.signaling.as_ref(), &recipients)
            .await;
        if let Err(e) = result {
            self.send_failed(e);
        }
    }

    async fn send(&mut self, command: SignalCommand) {
        if self.channel_lost {
            return;
        }
        let result = self.signaling.send(command).await;
        if let Err(e) = result {
            self.send_failed(e);
        }
    }

    fn send_failed(&mut self, e: SignalingError) {
        match e {
            SignalingError::Closed => {
                warn!("Signaling channel closed while sending");
                self.channel_lost = true;
            }
            other => error!("Failed to send signal: {}", other),
        }
    }

    /// Tears everything down. Afterwards the coordinator only rejects input.
    async fn end_session(&mut self, reason: EndReason) {
        if self.phase.is_ended() {
            return;
        }
        info!("Session ended: {}", reason);

        self.registry.clear();
        self.status.release();
        self.playback.reset();
        self.chat.clear();
        self.signaling.close().await;

        for input in self.pending.drain(..) {
            input.reject(MeshError::SessionEnded);
        }
        if let Some(reply) = self.capture_reply.take() {
            let _ = reply.send(Err(MeshError::SessionEnded));
        }

        self.phase = SessionPhase::Ended(reason);
    }

    fn publish(&self) {
        let view = SessionView {
            phase: self.phase.clone(),
            local: self.status.local().clone(),
            peers: self.registry.snapshot(),
            links: self.registry.link_states(),
            streams: self.registry.media_streams(),
            playback: self.playback.state().clone(),
            chat: self.chat.entries().cloned().collect(),
            chat_total: self.chat.total(),
        };

        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    fn local_id(&self) -> ParticipantId {
        self.status.local().id.clone()
    }

    fn is_local(&self, id: &ParticipantId) -> bool {
        &self.status.local().id == id
    }
}
