//! Observer fan-out and the TCP observer feed
//!
//! Producers publish into a broadcast channel and never wait on observers. A
//! slow observer lags and skips messages; it cannot hold up the physics tick.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::FeedFormat;
use crate::metrics::Metrics;
use crate::net::framing::{write_message, FramingError};
use crate::net::protocol::{encode_binary, encode_json_line, ServerMessage};

/// Handle for publishing to every connected observer
#[derive(Debug, Clone)]
pub struct Observers {
    tx: broadcast::Sender<Arc<ServerMessage>>,
}

impl Observers {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all current observers. Returns how many received it.
    pub fn publish(&self, message: ServerMessage) -> usize {
        // No receivers is the normal idle state
        self.tx.send(Arc::new(message)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerMessage>> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Accept observers and stream every published message to them
pub async fn start_observer_server(
    observers: Observers,
    metrics: Arc<Metrics>,
    addr: SocketAddr,
    format: FeedFormat,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Observer feed listening on tcp://{} ({:?})", addr, format);

    loop {
        let (socket, peer) = listener.accept().await?;
        let rx = observers.subscribe();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            metrics.observers_connected.fetch_add(1, Ordering::Relaxed);
            info!("Observer connected: {}", peer);

            if let Err(e) = stream_to_observer(socket, rx, format).await {
                debug!("Observer {} dropped: {}", peer, e);
            }

            metrics.observers_connected.fetch_sub(1, Ordering::Relaxed);
            info!("Observer disconnected: {}", peer);
        });
    }
}

/// Forward messages to one observer until it disconnects or the channel closes
async fn stream_to_observer(
    mut socket: TcpStream,
    mut rx: broadcast::Receiver<Arc<ServerMessage>>,
    format: FeedFormat,
) -> Result<(), FramingError> {
    loop {
        let message = match rx.recv().await {
            Ok(message) => message,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Observer lagging, skipped {} messages", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        };

        match format {
            FeedFormat::JsonLines => match encode_json_line(&message) {
                Ok(line) => socket.write_all(&line).await?,
                Err(e) => warn!("Failed to encode observer message: {}", e),
            },
            FeedFormat::Binary => match encode_binary(&*message) {
                Ok(frame) => write_message(&mut socket, &frame).await?,
                Err(e) => warn!("Failed to encode observer message: {}", e),
            },
        }
    }
}
