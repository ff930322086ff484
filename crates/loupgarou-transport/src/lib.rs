//! Transport layer for Loup-Garou.
//!
//! The game core never talks to sockets. It only sees a [`ConnectionId`],
//! the one identity a session trusts. This crate hands those ids out and
//! moves frames for them through the [`Transport`] and [`Connection`]
//! traits.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] over `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingWebSocket, WebSocketConnection, WebSocketTransport, DEFAULT_HANDSHAKE_TIMEOUT,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque per-connection identity.
///
/// Display names may collide; connection ids never do within one
/// process. Serialized as the bare number so clients can echo it back as
/// a night-action target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Hands out connection ids, starting at 1, never reusing one.
#[derive(Debug)]
pub struct ConnectionIds(AtomicU64);

impl ConnectionIds {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIds {
    fn default() -> Self {
        Self::new()
    }
}

/// What a connection hands back from [`Connection::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application payload.
    Data(Vec<u8>),
    /// A keepalive ping or pong. Carries nothing but proves the peer is
    /// still there.
    Heartbeat,
}

/// A listener that yields client connections.
pub trait Transport: Send + 'static {
    type Pending: PendingConnection;

    /// Waits for the next client socket.
    ///
    /// Returns as soon as the socket is accepted. The protocol handshake
    /// runs later in [`PendingConnection::establish`], so a client that
    /// never finishes it cannot hold up the listener.
    async fn accept(&mut self) -> Result<Self::Pending, TransportError>;
}

/// An accepted socket whose handshake has not run yet.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;

    fn id(&self) -> ConnectionId;

    /// Completes the handshake. Fails for this client only, on a bad
    /// upgrade or when the peer takes too long.
    async fn establish(self) -> Result<Self::Connection, TransportError>;
}

/// One client: frames in, frames out.
///
/// `send`, `ping` and `recv` must be callable concurrently from different
/// tasks: the server reads requests on one task while pushing events from
/// another.
pub trait Connection: Send + Sync + 'static {
    fn id(&self) -> ConnectionId;

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Asks the peer to prove it is alive. The answer shows up in `recv`
    /// as [`Frame::Heartbeat`].
    async fn ping(&self) -> Result<(), TransportError>;

    /// The next frame from the client, or `Ok(None)` once it has closed.
    async fn recv(&self) -> Result<Option<Frame>, TransportError>;
}
