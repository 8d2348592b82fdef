pub mod chat;
pub mod config;
pub mod error;
pub mod link;
pub mod mesh;
pub mod playback;
pub mod registry;
pub mod signaling;
pub mod status;
pub mod view;

pub use chat::{ChatEntry, ChatLog};
pub use config::ClientConfig;
pub use error::{CaptureError, LinkError, MeshError, SignalingError};
pub use link::*;
pub use mesh::{LocalAction, MeshCoordinator, MeshHandle, MeshInput, MeshServices, elect};
pub use playback::{EchoGuard, PlaybackSync, Player, VirtualPlayer};
pub use registry::{PeerRegistry, Upsert};
pub use signaling::{SignalingOutput, WsSignaling, forward_events};
pub use status::{CapabilityPlan, DeniedCapture, MediaCapture, StatusBroadcaster, SyntheticCapture};
pub use view::{EndReason, SessionPhase, SessionView};
