use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// The controllable video player the shared playback drives.
pub trait Player: Send {
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_seconds: f64);
    fn current_time(&self) -> f64;
}

#[derive(Debug, Default)]
struct Clock {
    source_url: Option<String>,
    /// Position at `since`.
    anchor: f64,
    since: Option<Instant>,
}

impl Clock {
    fn position(&self) -> f64 {
        match self.since {
            Some(since) => self.anchor + since.elapsed().as_secs_f64(),
            None => self.anchor,
        }
    }
}

/// Player without a screen: tracks the source and a position that advances
/// with time while playing. Clones share the same clock, so a front-end can
/// keep one clone while the coordinator drives another.
#[derive(Debug, Clone, Default)]
pub struct VirtualPlayer {
    clock: Arc<Mutex<Clock>>,
}

impl VirtualPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_url(&self) -> Option<String> {
        self.lock().source_url.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().since.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Clock> {
        // A poisoned clock still holds a usable position.
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Player for VirtualPlayer {
    fn load(&mut self, url: &str) {
        let mut clock = self.lock();
        *clock = Clock {
            source_url: Some(url.to_owned()),
            ..Default::default()
        };
    }

    fn play(&mut self) {
        let mut clock = self.lock();
        if clock.since.is_none() {
            clock.since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut clock = self.lock();
        clock.anchor = clock.position();
        clock.since = None;
    }

    fn seek(&mut self, position_seconds: f64) {
        let mut clock = self.lock();
        clock.anchor = position_seconds.max(0.0);
        if clock.since.is_some() {
            clock.since = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        self.lock().position()
    }
}
