use crate::link::{LinkState, PeerLink, RemoteMedia};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use watchparty_core::{Participant, ParticipantId, ParticipantUpdate};

/// Outcome of [`PeerRegistry::upsert_participant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

/// Authoritative map of known remote participants and their links.
///
/// The registry is the only owner of [`PeerLink`]s and holds at most one per
/// participant. Subscribers get a fresh participant snapshot (insertion
/// order) after every change.
pub struct PeerRegistry {
    participants: Vec<Participant>,
    links: HashMap<ParticipantId, PeerLink>,
    snapshot_tx: watch::Sender<Arc<[Participant]>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::from(Vec::new()));

        Self {
            participants: Vec::new(),
            links: HashMap::new(),
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[Participant]>> {
        self.snapshot_tx.subscribe()
    }

    /// Inserts the participant or merges the carried fields into the known
    /// record. Granting host to one participant takes it from every other.
    pub fn upsert_participant(&mut self, update: &ParticipantUpdate) -> Upsert {
        let mut outcome = match self.participants.iter_mut().find(|p| p.id == update.id) {
            Some(existing) => {
                if existing.merge(update) {
                    Upsert::Updated
                } else {
                    Upsert::Unchanged
                }
            }
            None => {
                let mut participant = Participant::new(update.id.clone());
                participant.merge(update);
                self.participants.push(participant);
                debug!("Participant {} registered", update.id);
                Upsert::Inserted
            }
        };

        if update.is_host == Some(true) {
            for other in self.participants.iter_mut().filter(|p| p.id != update.id) {
                if other.is_host {
                    other.is_host = false;
                    if outcome == Upsert::Unchanged {
                        outcome = Upsert::Updated;
                    }
                }
            }
        }

        if outcome != Upsert::Unchanged {
            self.notify();
        }
        outcome
    }

    /// Forgets the participant and destroys its link, if any.
    pub fn remove_participant(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.clear_link(id);

        let index = self.participants.iter().position(|p| &p.id == id)?;
        let removed = self.participants.remove(index);
        self.notify();
        Some(removed)
    }

    /// Hands host to `host` (creating the record if needed), or clears it from
    /// everyone when `None`.
    pub fn assign_host(&mut self, host: Option<&ParticipantId>) {
        match host {
            Some(id) => {
                self.upsert_participant(&ParticipantUpdate::new(id.clone()).with_host(true));
            }
            None => {
                let mut changed = false;
                for participant in self.participants.iter_mut().filter(|p| p.is_host) {
                    participant.is_host = false;
                    changed = true;
                }
                if changed {
                    self.notify();
                }
            }
        }
    }

    pub fn get_link(&self, id: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(id)
    }

    pub fn get_link_mut(&mut self, id: &ParticipantId) -> Option<&mut PeerLink> {
        self.links.get_mut(id)
    }

    /// Registers a link. Refused if the participant is unknown or already has
    /// one; a refused link is dropped, which destroys its engine.
    pub fn set_link(&mut self, link: PeerLink) -> bool {
        let id = link.remote_id().clone();

        if self.links.contains_key(&id) {
            warn!("Rejected duplicate link {} for {}", link.id(), id);
            return false;
        }
        if !self.contains(&id) {
            warn!("Rejected link {} for unknown participant {}", link.id(), id);
            return false;
        }

        self.links.insert(id, link);
        true
    }

    /// Destroys and removes the link for `id`. Returns whether one existed.
    pub fn clear_link(&mut self, id: &ParticipantId) -> bool {
        match self.links.remove(id) {
            Some(mut link) => {
                link.close();
                true
            }
            None => false,
        }
    }

    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut PeerLink> {
        self.links.values_mut()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| &p.id == id)
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn host(&self) -> Option<&ParticipantId> {
        self.participants.iter().find(|p| p.is_host).map(|p| &p.id)
    }

    /// Immutable, insertion-ordered view of every participant.
    pub fn snapshot(&self) -> Arc<[Participant]> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn link_states(&self) -> BTreeMap<ParticipantId, LinkState> {
        self.links
            .iter()
            .map(|(id, link)| (id.clone(), link.state()))
            .collect()
    }

    pub fn media_streams(&self) -> BTreeMap<ParticipantId, RemoteMedia> {
        self.links
            .iter()
            .filter_map(|(id, link)| link.media().map(|m| (id.clone(), m.clone())))
            .collect()
    }

    /// Destroys every link and forgets every participant.
    pub fn clear(&mut self) {
        if !self.links.is_empty() {
            info!("Tearing down {} peer links", self.links.len());
        }
        for (_, mut link) in self.links.drain() {
            link.close();
        }
        if !self.participants.is_empty() {
            self.participants.clear();
            self.notify();
        }
    }

    fn notify(&self) {
        self.snapshot_tx
            .send_replace(Arc::from(self.participants.clone()));
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
