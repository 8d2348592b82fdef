use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use watchparty_client::{
    EngineFactory, LinkError, LinkEvent, LinkId, LinkRole, LinkSpec, LocalTrack,
    NegotiationEngine, RemoteMedia, TrackKind,
};
use watchparty_core::ParticipantId;

/// Everything the engines of one session were asked to do.
#[derive(Default)]
struct EngineLog {
    created: Vec<LinkSpec>,
    signals: HashMap<LinkId, Vec<String>>,
    tracks: HashMap<LinkId, Vec<(TrackKind, bool)>>,
    destroyed: Vec<LinkId>,
    events: HashMap<LinkId, mpsc::UnboundedSender<LinkEvent>>,
}

/// Factory of scripted engines.
///
/// With negotiation on, an initiator offers as soon as it is created, a
/// responder answers the first offer it is fed and reports itself
/// established, and an initiator fed an answer reports itself established.
#[derive(Clone)]
pub struct MockEngineFactory {
    log: Arc<Mutex<EngineLog>>,
    negotiate: bool,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog::default())),
            negotiate: true,
        }
    }

    /// Engines that never report anything on their own.
    pub fn silent() -> Self {
        Self {
            negotiate: false,
            ..Self::new()
        }
    }

    pub fn created(&self) -> Vec<LinkSpec> {
        self.lock().created.clone()
    }

    pub fn links_for(&self, remote: &ParticipantId) -> Vec<LinkSpec> {
        self.lock()
            .created
            .iter()
            .filter(|spec| &spec.remote_id == remote)
            .cloned()
            .collect()
    }

    pub fn signals(&self, link: LinkId) -> Vec<String> {
        self.lock().signals.get(&link).cloned().unwrap_or_default()
    }

    /// Track updates as `(kind, attached)`, in order.
    pub fn tracks(&self, link: LinkId) -> Vec<(TrackKind, bool)> {
        self.lock().tracks.get(&link).cloned().unwrap_or_default()
    }

    pub fn is_destroyed(&self, link: LinkId) -> bool {
        self.lock().destroyed.contains(&link)
    }

    /// Reports an event as if the engine of `spec` produced it.
    pub fn emit(&self, spec: &LinkSpec, event: impl FnOnce(ParticipantId, LinkId) -> LinkEvent) {
        let log = self.lock();
        if let Some(tx) = log.events.get(&spec.link_id) {
            let _ = tx.send(event(spec.remote_id.clone(), spec.link_id));
        }
    }

    pub fn attach_media(&self, spec: &LinkSpec, kind: TrackKind) {
        self.emit(spec, |remote, link| LinkEvent::MediaAttached {
            media: RemoteMedia::single(format!("stream-{remote}"), kind),
            remote,
            link,
        });
    }

    pub fn fail(&self, spec: &LinkSpec) {
        self.emit(spec, |remote, link| LinkEvent::Failed {
            remote,
            link,
            reason: "ice failed".into(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        spec: &LinkSpec,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn NegotiationEngine>, LinkError> {
        tracing::debug!("[MockEngine] create {:?} link to {}", spec.role, spec.remote_id);

        let mut log = self.lock();
        log.created.push(spec.clone());
        log.events.insert(spec.link_id, events.clone());
        drop(log);

        if self.negotiate && spec.role == LinkRole::Initiator {
            let _ = events.send(LinkEvent::Signal {
                remote: spec.remote_id.clone(),
                link: spec.link_id,
                payload: format!("offer:{}", spec.link_id),
            });
        }

        Ok(Box::new(MockEngine {
            spec: spec.clone(),
            events,
            log: self.log.clone(),
            negotiate: self.negotiate,
        }))
    }
}

struct MockEngine {
    spec: LinkSpec,
    events: mpsc::UnboundedSender<LinkEvent>,
    log: Arc<Mutex<EngineLog>>,
    negotiate: bool,
}

impl NegotiationEngine for MockEngine {
    fn signal(&mut self, payload: String) -> Result<(), LinkError> {
        self.log
            .lock()
            .unwrap()
            .signals
            .entry(self.spec.link_id)
            .or_default()
            .push(payload.clone());

        if !self.negotiate {
            return Ok(());
        }

        let remote = self.spec.remote_id.clone();
        let link = self.spec.link_id;
        match self.spec.role {
            LinkRole::Responder if payload.starts_with("offer") => {
                let _ = self.events.send(LinkEvent::Signal {
                    remote: remote.clone(),
                    link,
                    payload: format!("answer:{link}"),
                });
                let _ = self.events.send(LinkEvent::Established { remote, link });
            }
            LinkRole::Initiator if payload.starts_with("answer") => {
                let _ = self.events.send(LinkEvent::Established { remote, link });
            }
            _ => {}
        }
        Ok(())
    }

    fn set_local_track(
        &mut self,
        kind: TrackKind,
        track: Option<LocalTrack>,
    ) -> Result<(), LinkError> {
        self.log
            .lock()
            .unwrap()
            .tracks
            .entry(self.spec.link_id)
            .or_default()
            .push((kind, track.is_some()));
        Ok(())
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().destroyed.push(self.spec.link_id);
    }
}
