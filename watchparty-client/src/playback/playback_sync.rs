use crate::error::MeshError;
use crate::playback::Player;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use watchparty_core::{PlaybackAction, PlaybackMessage, SharedPlayback};

/// How far a reported position may drift from an applied one and still be
/// taken as its echo (seconds).
const ECHO_POSITION_TOLERANCE: f64 = 0.5;

/// Remembers the transitions applied to the player on behalf of a remote
/// participant. The player reports each of them back once; a report matching
/// one of them inside the window is that echo. Anything else is the user's.
#[derive(Debug, Clone)]
pub struct EchoGuard {
    window: Duration,
    expected: Vec<(PlaybackAction, f64, Instant)>,
}

impl EchoGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            expected: Vec::new(),
        }
    }

    /// Expects the player to report `action` at `position` within the window.
    pub fn expect(&mut self, action: PlaybackAction, position: f64) {
        let until = Instant::now() + self.window;
        self.expected.push((action, position, until));
    }

    pub fn is_armed(&self) -> bool {
        let now = Instant::now();
        self.expected.iter().any(|(_, _, until)| now < *until)
    }

    /// Consumes the pending echo matching the reported transition, if any.
    pub fn absorb(&mut self, action: PlaybackAction, position: f64) -> bool {
        let now = Instant::now();
        self.expected.retain(|(_, _, until)| now < *until);

        let found = self.expected.iter().position(|(expected, at, _)| {
            *expected == action && (at - position).abs() <= ECHO_POSITION_TOLERANCE
        });
        match found {
            Some(index) => {
                self.expected.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn disarm(&mut self) {
        self.expected.clear();
    }
}

/// Keeps the local player and the shared playback state in step with the
/// rest of the session.
pub struct PlaybackSync {
    player: Box<dyn Player>,
    state: SharedPlayback,
    guard: EchoGuard,
    host_gated: bool,
}

impl PlaybackSync {
    pub fn new(player: Box<dyn Player>, echo_window: Duration, host_gated: bool) -> Self {
        Self {
            player,
            state: SharedPlayback::default(),
            guard: EchoGuard::new(echo_window),
            host_gated,
        }
    }

    pub fn state(&self) -> &SharedPlayback {
        &self.state
    }

    /// Switches the local player to `url` and returns the message announcing it.
    pub fn share_source(&mut self, url: &str, is_host: bool) -> Result<PlaybackMessage, MeshError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MeshError::EmptySource);
        }
        if self.host_gated && !is_host {
            return Err(MeshError::NotHost);
        }

        info!("Sharing video {}", url);
        self.load(url);
        Ok(PlaybackMessage::source(url))
    }

    /// A transition reported by the local player. Returns the message to relay,
    /// or `None` when the transition echoes a remote action just applied.
    pub fn local_transition(
        &mut self,
        action: PlaybackAction,
        position_seconds: Option<f64>,
    ) -> Option<PlaybackMessage> {
        let position = position_seconds.unwrap_or_else(|| self.player.current_time());
        if self.guard.absorb(action, position) {
            debug!("Suppressed echo of {:?} at {}", action, position);
            return None;
        }

        self.record(action, position);
        Some(PlaybackMessage::action(action, position))
    }

    /// Everything a newly joined participant needs to catch up: the source,
    /// where the player is now and whether it is running.
    pub fn catch_up(&self) -> Option<PlaybackMessage> {
        let source_url = self.state.source_url.clone()?;
        let action = if self.state.playing {
            PlaybackAction::Play
        } else {
            PlaybackAction::Pause
        };

        Some(PlaybackMessage {
            source_url: Some(source_url),
            action: Some(action),
            position_seconds: Some(self.player.current_time()),
        })
    }

    /// Applies a relayed message: source first, then position, then intent.
    /// Returns `false` when the message was rejected.
    pub fn apply_remote(&mut self, message: &PlaybackMessage, sender_is_host: bool) -> bool {
        if let Some(url) = &message.source_url {
            if self.state.source_url.as_deref() != Some(url.as_str()) {
                if self.host_gated && !sender_is_host {
                    warn!("Dropped video change to {} from a non-host", url);
                    return false;
                }
                info!("Switching to shared video {}", url);
                self.load(url);
            }
        }

        if let Some(position) = message.position_seconds {
            self.guard.expect(PlaybackAction::Seek, position);
            self.player.seek(position);
            self.state.position_seconds = position;
        }

        if let Some(action) = message.action {
            let position = message
                .position_seconds
                .unwrap_or(self.state.position_seconds);
            match action {
                PlaybackAction::Play => self.player.play(),
                PlaybackAction::Pause => self.player.pause(),
                PlaybackAction::Seek => {}
            }
            // A seek with a position is already expected above.
            if action != PlaybackAction::Seek || message.position_seconds.is_none() {
                self.guard.expect(action, position);
            }
            self.record(action, position);
        }

        true
    }

    pub fn reset(&mut self) {
        self.state = SharedPlayback::default();
        self.guard.disarm();
        self.player.pause();
    }

    fn load(&mut self, url: &str) {
        self.player.load(url);
        self.state = SharedPlayback {
            source_url: Some(url.to_owned()),
            position_seconds: 0.0,
            playing: false,
        };
    }

    fn record(&mut self, action: PlaybackAction, position: f64) {
        self.state.position_seconds = position;
        match action {
            PlaybackAction::Play => self.state.playing = true,
            PlaybackAction::Pause => self.state.playing = false,
            PlaybackAction::Seek => {}
        }
    }
}
