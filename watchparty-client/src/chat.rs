use std::collections::VecDeque;
use watchparty_core::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub from: ParticipantId,
    pub name: String,
    pub text: String,
    /// Sent by the local participant.
    pub local: bool,
}

/// Chat of the live session, oldest first. Drops the oldest entries past
/// its limit.
#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    limit: usize,
    total: u64,
}

impl ChatLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
            total: 0,
        }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.total += 1;
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    /// Entries ever pushed, including dropped and cleared ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
