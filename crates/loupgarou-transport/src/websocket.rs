//! WebSocket transport over `tokio-tungstenite`.
//!
//! Clients are browsers and phones speaking JSON, so UTF-8 frames go out
//! as text messages. Anything else goes out as binary.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{
    Connection, ConnectionId, ConnectionIds, Frame, PendingConnection, Transport,
    TransportError,
};

type Outgoing = SplitSink<WebSocketStream<TcpStream>, Message>;
type Incoming = SplitStream<WebSocketStream<TcpStream>>;

/// How long a client gets to finish the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens for WebSocket clients.
pub struct WebSocketTransport {
    listener: TcpListener,
    ids: ConnectionIds,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "listening for WebSocket clients");
        Ok(Self {
            listener,
            ids: ConnectionIds::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Sets how long each client gets to complete the upgrade.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// The bound address. Useful after binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Pending = PendingWebSocket;

    async fn accept(&mut self) -> Result<PendingWebSocket, TransportError> {
        let (stream, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        let id = self.ids.next();
        tracing::debug!(%id, %peer, "TCP client accepted");
        Ok(PendingWebSocket {
            id,
            peer,
            stream,
            timeout: self.handshake_timeout,
        })
    }
}

/// A TCP client that has not upgraded to WebSocket yet.
pub struct PendingWebSocket {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    timeout: Duration,
}

impl PendingConnection for PendingWebSocket {
    type Connection = WebSocketConnection;

    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn establish(self) -> Result<WebSocketConnection, TransportError> {
        let peer = self.peer;
        let ws = match tokio::time::timeout(
            self.timeout,
            tokio_tungstenite::accept_async(self.stream),
        )
        .await
        {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => return Err(TransportError::Upgrade(format!("{peer}: {e}"))),
            Err(_) => {
                return Err(TransportError::Upgrade(format!(
                    "{peer}: no upgrade within {:?}",
                    self.timeout
                )));
            }
        };

        tracing::debug!(id = %self.id, %peer, "WebSocket client connected");

        let (outgoing, incoming) = ws.split();
        Ok(WebSocketConnection {
            id: self.id,
            outgoing: Mutex::new(outgoing),
            incoming: Mutex::new(incoming),
        })
    }
}

/// One WebSocket client.
///
/// The socket is split, so a task parked in `recv` never holds up `send`.
pub struct WebSocketConnection {
    id: ConnectionId,
    outgoing: Mutex<Outgoing>,
    incoming: Mutex<Incoming>,
}

impl Connection for WebSocketConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let message = match std::str::from_utf8(frame) {
            Ok(text) => Message::text(text),
            Err(_) => Message::binary(frame.to_vec()),
        };
        self.write(message).await
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.write(Message::Ping(Default::default())).await
    }

    async fn recv(&self) -> Result<Option<Frame>, TransportError> {
        let mut incoming = self.incoming.lock().await;
        while let Some(message) = incoming.next().await {
            let message = message.map_err(|e| TransportError::Receive {
                id: self.id,
                reason: e.to_string(),
            })?;
            match message {
                Message::Text(text) => return Ok(Some(Frame::Data(text.as_bytes().to_vec()))),
                Message::Binary(data) => return Ok(Some(Frame::Data(data.to_vec()))),
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) => return Ok(Some(Frame::Heartbeat)),
                Message::Close(_) => return Ok(None),
                Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}

impl WebSocketConnection {
    async fn write(&self, message: Message) -> Result<(), TransportError> {
        self.outgoing
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| TransportError::Send {
                id: self.id,
                reason: e.to_string(),
            })
    }
}
