mod playback_sync;
mod player;

pub use playback_sync::*;
pub use player::*;
