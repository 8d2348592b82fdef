use crate::error::SignalingError;
use crate::mesh::MeshHandle;
use crate::signaling::SignalingOutput;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use watchparty_core::{SignalCommand, SignalEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Signaling channel over a websocket to the relay. Each frame is one JSON
/// encoded [`SignalCommand`] or [`SignalEvent`].
pub struct WsSignaling {
    outgoing: mpsc::UnboundedSender<Message>,
}

impl WsSignaling {
    /// Connects to the relay. Inbound events arrive on the returned receiver,
    /// which ends when the socket does.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<SignalEvent>)> {
        info!("Connecting to signaling relay {}", url);

        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        info!("Connected to signaling relay");

        let (write, read) = stream.split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_frames(write, outgoing_rx));
        tokio::spawn(read_frames(read, events_tx));

        Ok((
            Self {
                outgoing: outgoing_tx,
            },
            events_rx,
        ))
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn send(&self, command: SignalCommand) -> Result<(), SignalingError> {
        let json = serde_json::to_string(&command)?;
        self.outgoing
            .send(Message::Text(json))
            .map_err(|_| SignalingError::Closed)
    }

    async fn close(&self) {
        let _ = self.outgoing.send(Message::Close(None));
    }
}

async fn write_frames(mut write: SplitSink<WsStream, Message>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = write.send(message).await {
            error!("Failed to write to signaling relay: {}", e);
            break;
        }
        if closing {
            break;
        }
    }

    debug!("Signaling writer finished");
}

async fn read_frames(mut read: SplitStream<WsStream>, events: mpsc::UnboundedSender<SignalEvent>) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<SignalEvent>(&text) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Invalid signaling frame: {}", e),
            },
            Ok(Message::Close(_)) => {
                info!("Signaling relay closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Signaling relay error: {}", e);
                break;
            }
        }
    }

    debug!("Signaling reader finished");
}

/// Pumps relay events into the session until either side goes away, then
/// reports the channel as closed.
pub async fn forward_events(mut events: mpsc::UnboundedReceiver<SignalEvent>, handle: MeshHandle) {
    while let Some(event) = events.recv().await {
        if handle.signal(event).await.is_err() {
            debug!("Session stopped accepting relay events");
            return;
        }
    }

    handle.channel_closed().await;
}
