pub mod mesh_tests;
pub mod session_tests;

use tracing::Level;
use watchparty_core::{ParticipantId, PeerRecord};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn id(raw: &str) -> ParticipantId {
    ParticipantId::from(raw)
}

pub fn records(ids: &[&str]) -> Vec<PeerRecord> {
    ids.iter().map(|raw| PeerRecord::new(*raw)).collect()
}
