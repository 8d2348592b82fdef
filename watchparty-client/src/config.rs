use crate::link::LinkConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use watchparty_core::IceServerConfig;

/// Client settings. Every field has a default, so a config file only needs
/// the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// How long a remote playback action applied to the local player waits
    /// for the player to report it back as an echo.
    pub echo_suppression_ms: u64,
    /// Only the host may change the shared video source.
    pub host_gated_sources: bool,
    pub chat_history_limit: usize,
    /// Inputs kept while waiting for the relay to assign our id.
    pub pending_input_limit: usize,
    pub ice_gathering_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8080/ws".to_owned(),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            echo_suppression_ms: 1000,
            host_gated_sources: true,
            chat_history_limit: 200,
            pending_input_limit: 64,
            ice_gathering_timeout_ms: 3000,
        }
    }
}

impl ClientConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse client config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_suppression_ms)
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            ice_servers: self.ice_servers.clone(),
            gathering_timeout: Duration::from_millis(self.ice_gathering_timeout_ms),
        }
    }
}
