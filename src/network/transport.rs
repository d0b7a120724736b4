//! Signal Transports
//!
//! One abstraction over two carriers:
//! - `LocalBus`: same-process broadcast, for two peers in one process
//! - `WsSignalChannel`: a WebSocket between two peers
//!
//! Delivery is best-effort and unordered from the protocol's point of view.
//! Handlers only ever see signals that passed boundary validation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tracing::{debug, warn};

use crate::network::signal::{SignalError, SignalMessage};

/// Transport failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Signal could not be serialized.
    #[error("failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),

    /// Outgoing signal failed validation.
    #[error("refusing to send invalid signal: {0}")]
    Invalid(#[from] SignalError),

    /// Peer connection is gone.
    #[error("signal channel closed")]
    Closed,

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Handle returned by [`SignalTransport::on_signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// Callback invoked for every delivered signal.
pub type SignalHandler = Arc<dyn Fn(&SignalMessage) + Send + Sync>;

/// Carrier for out-of-band signals.
pub trait SignalTransport: Send + Sync {
    /// Send a signal to the other peer.
    fn send_signal(&self, message: &SignalMessage) -> Result<(), TransportError>;

    /// Register a handler for incoming signals.
    fn on_signal(&self, handler: SignalHandler) -> HandlerId;

    /// Remove a handler. Returns false if it was not registered.
    fn off_signal(&self, id: HandlerId) -> bool;
}

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

/// Shared handler table.
#[derive(Clone, Default)]
struct HandlerRegistry {
    next_id: Arc<AtomicU64>,
    handlers: Arc<Mutex<BTreeMap<HandlerId, SignalHandler>>>,
}

impl HandlerRegistry {
    fn insert(&self, handler: SignalHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handler);
        id
    }

    fn remove(&self, id: HandlerId) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    fn dispatch(&self, message: &SignalMessage) {
        // Snapshot so handlers may (un)register or send without deadlocking.
        let handlers: Vec<SignalHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for handler in handlers {
            handler(message);
        }
    }
}

// =============================================================================
// LOCAL BUS
// =============================================================================

/// Same-process broadcast bus.
///
/// Clones share one handler table. Every signal is encoded and decoded like
/// a remote one, so the local path exercises the same boundary checks.
#[derive(Clone, Default)]
pub struct LocalBus {
    registry: HandlerRegistry,
}

impl LocalBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalTransport for LocalBus {
    fn send_signal(&self, message: &SignalMessage) -> Result<(), TransportError> {
        let text = message.encode()?;
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(payload = %text, "Local bus signal");
        let delivered = SignalMessage::decode(&text)?;
        self.registry.dispatch(&delivered);
        Ok(())
    }

    fn on_signal(&self, handler: SignalHandler) -> HandlerId {
        self.registry.insert(handler)
    }

    fn off_signal(&self, id: HandlerId) -> bool {
        self.registry.remove(id)
    }
}

// =============================================================================
// WEBSOCKET CHANNEL
// =============================================================================

/// Peer-to-peer signal channel over one WebSocket.
pub struct WsSignalChannel {
    outbound: mpsc::UnboundedSender<String>,
    registry: HandlerRegistry,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsSignalChannel {
    /// Accept an incoming peer connection.
    pub async fn accept(stream: TcpStream) -> Result<Self, TransportError> {
        let ws = accept_async(stream).await?;
        Ok(Self::spawn(ws))
    }

    /// Connect to a peer at `url` (e.g. `ws://127.0.0.1:9001`).
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _) = connect_async(url).await?;
        Ok(Self::spawn(ws))
    }

    /// Run reader and writer tasks over an established WebSocket.
    pub fn spawn<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_sender, mut ws_receiver) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let registry = HandlerRegistry::default();

        let writer = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let inbound = registry.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => match SignalMessage::decode(&text) {
                        Ok(signal) => inbound.dispatch(&signal),
                        Err(e) => warn!("Dropping invalid signal: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        debug!("Peer closed signal channel");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Signal channel error: {}", e);
                        break;
                    }
                }
            }
        });

        Self { outbound, registry, reader, writer }
    }

    /// Stop both tasks.
    pub fn close(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for WsSignalChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl SignalTransport for WsSignalChannel {
    fn send_signal(&self, message: &SignalMessage) -> Result<(), TransportError> {
        message.validate()?;
        let text = message.encode()?;
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(payload = %text, "Outbound ws signal");
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    fn on_signal(&self, handler: SignalHandler) -> HandlerId {
        self.registry.insert(handler)
    }

    fn off_signal(&self, id: HandlerId) -> bool {
        self.registry.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use crate::network::signal::GuessSignal;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn guess(from: &str, x: i32) -> SignalMessage {
        SignalMessage::Guess(GuessSignal {
            game_id: "m".to_string(),
            from_player_id: from.to_string(),
            coord: Coord::new(x, 0),
        })
    }

    fn collecting_handler() -> (SignalHandler, Arc<Mutex<Vec<SignalMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: SignalHandler = Arc::new(move |m: &SignalMessage| {
            sink.lock().unwrap().push(m.clone());
        });
        (handler, seen)
    }

    #[test]
    fn test_local_bus_broadcasts_to_all_handlers() {
        let bus = LocalBus::new();
        let peer = bus.clone();
        let (h1, seen1) = collecting_handler();
        let (h2, seen2) = collecting_handler();
        bus.on_signal(h1);
        peer.on_signal(h2);

        peer.send_signal(&guess("0", 1)).unwrap();

        assert_eq!(seen1.lock().unwrap().as_slice(), &[guess("0", 1)]);
        assert_eq!(seen2.lock().unwrap().as_slice(), &[guess("0", 1)]);
    }

    #[test]
    fn test_local_bus_off_signal() {
        let bus = LocalBus::new();
        let (handler, seen) = collecting_handler();
        let id = bus.on_signal(handler);

        assert!(bus.off_signal(id));
        assert!(!bus.off_signal(id));
        bus.send_signal(&guess("0", 1)).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_local_bus_refuses_invalid_signal() {
        let bus = LocalBus::new();
        let (handler, seen) = collecting_handler();
        bus.on_signal(handler);

        let result = bus.send_signal(&guess("0", 12));
        assert!(matches!(result, Err(TransportError::Invalid(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ws_channel_delivers_between_peers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            WsSignalChannel::accept(stream).await.unwrap()
        });
        let client = WsSignalChannel::connect(&format!("ws://{}", addr)).await.unwrap();
        let server = server.await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        server.on_signal(Arc::new(move |m: &SignalMessage| {
            let _ = tx.send(m.clone());
        }));

        client.send_signal(&guess("0", 4)).unwrap();
        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, guess("0", 4));

        assert!(matches!(
            client.send_signal(&guess("", 4)),
            Err(TransportError::Invalid(_))
        ));
    }
}
