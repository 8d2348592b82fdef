use std::sync::{Arc, Mutex};
use watchparty_client::Player;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
}

/// Player that records every call it receives.
#[derive(Clone, Default)]
pub struct RecordingPlayer {
    calls: Arc<Mutex<Vec<PlayerCall>>>,
    position: Arc<Mutex<f64>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Moves the playhead without recording a call, as a user dragging the
    /// seek bar would.
    pub fn set_position(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }

    fn record(&self, call: PlayerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Player for RecordingPlayer {
    fn load(&mut self, url: &str) {
        self.record(PlayerCall::Load(url.to_owned()));
        self.set_position(0.0);
    }

    fn play(&mut self) {
        self.record(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.record(PlayerCall::Pause);
    }

    fn seek(&mut self, position_seconds: f64) {
        self.record(PlayerCall::Seek(position_seconds));
        self.set_position(position_seconds);
    }

    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }
}
