mod media_capture;
mod status_broadcaster;

pub use media_capture::*;
pub use status_broadcaster::*;
