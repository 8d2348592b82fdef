use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of a manually entered session id.
pub const MANUAL_ID_LEN: usize = 5;

/// Session-scoped participant id, assigned by the signaling relay.
///
/// Ids are totally ordered so both ends of a pair can elect roles
/// independently.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses an id typed by the user: surrounding whitespace is dropped and
    /// the id is upper-cased before it is checked.
    pub fn parse_manual(input: &str) -> Result<Self, InvalidPeerId> {
        let candidate = input.trim().to_ascii_uppercase();

        let actual = candidate.chars().count();
        if actual != MANUAL_ID_LEN {
            return Err(InvalidPeerId::Length {
                expected: MANUAL_ID_LEN,
                actual,
            });
        }
        if let Some(c) = candidate.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(InvalidPeerId::Character(c));
        }

        Ok(Self(candidate))
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPeerId {
    #[error("peer id must be {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("peer id contains invalid character {0:?}")]
    Character(char),
}

/// One session member as seen by this client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: Option<String>,
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
    pub is_host: bool,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            display_name: None,
            camera_enabled: false,
            microphone_enabled: false,
            is_host: false,
        }
    }

    /// Folds a partial update in. Fields the update does not carry are kept.
    /// Returns whether anything changed.
    pub fn merge(&mut self, update: &ParticipantUpdate) -> bool {
        let before = self.clone();

        if let Some(name) = &update.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(camera) = update.camera_enabled {
            self.camera_enabled = camera;
        }
        if let Some(mic) = update.microphone_enabled {
            self.microphone_enabled = mic;
        }
        if let Some(host) = update.is_host {
            self.is_host = host;
        }

        *self != before
    }

    /// Label for display: the chosen name, or the id when none was set.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Partial participant record. `None` means "not carried by this update".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantUpdate {
    pub id: ParticipantId,
    pub display_name: Option<String>,
    pub camera_enabled: Option<bool>,
    pub microphone_enabled: Option<bool>,
    pub is_host: Option<bool>,
}

impl ParticipantUpdate {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_camera(mut self, enabled: bool) -> Self {
        self.camera_enabled = Some(enabled);
        self
    }

    pub fn with_microphone(mut self, enabled: bool) -> Self {
        self.microphone_enabled = Some(enabled);
        self
    }

    pub fn with_host(mut self, host: bool) -> Self {
        self.is_host = Some(host);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
