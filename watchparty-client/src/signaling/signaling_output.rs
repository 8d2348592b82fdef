use crate::error::SignalingError;
use async_trait::async_trait;
use watchparty_core::SignalCommand;

/// Outgoing side of the signaling relay. Implemented by the websocket
/// adapter, and by test doubles that capture what the coordinator sends.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, command: SignalCommand) -> Result<(), SignalingError>;

    /// Detaches from the relay. Nothing is sent afterwards.
    async fn close(&self) {}
}
