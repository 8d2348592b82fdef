use std::time::Duration;
use watchparty_core::IceServerConfig;

/// Settings for the WebRTC negotiation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Upper bound on waiting for ICE gathering before a description is sent.
    pub gathering_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            gathering_timeout: Duration::from_secs(3),
        }
    }
}
