use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackAction {
    Play,
    Pause,
    Seek,
}

/// Relay payload for shared playback. A message may carry a new source,
/// a transport action, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<PlaybackAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_seconds: Option<f64>,
}

impl PlaybackMessage {
    pub fn source(url: impl Into<String>) -> Self {
        Self {
            source_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn action(action: PlaybackAction, position_seconds: f64) -> Self {
        Self {
            source_url: None,
            action: Some(action),
            position_seconds: Some(position_seconds),
        }
    }
}

/// Last known shared transport state. Used to reconcile players, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPlayback {
    pub source_url: Option<String>,
    pub position_seconds: f64,
    pub playing: bool,
}
