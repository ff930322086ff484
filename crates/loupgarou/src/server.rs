//! `LoupGarouServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → coordinator. The server
//! also plays the delivery role for the coordinator: [`Outboxes`] knows
//! every open connection, so it is the sink that turns an audience into
//! recipients.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use loupgarou_coordinator::{
    AddressResolver, Coordinator, EventSink, NoDiscovery, Outbound, ServerEvent,
};
use loupgarou_protocol::{Codec, ConnectionId, JsonCodec};
use loupgarou_session::GameConfig;
use loupgarou_transport::{PendingConnection, Transport, WebSocketTransport};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::handler::handle_connection;
use crate::LoupGarouError;

/// Default listen address for [`LoupGarouServerBuilder`].
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// How long a connection may stay silent, pongs included, before it is
/// treated as gone.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Events a connection may have queued before it counts as stalled and is
/// dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// One connection's queue, feeding its writer task.
struct Outbox {
    tx: mpsc::Sender<ServerEvent>,
    /// Nothing but `Welcome` is queued until `Welcome` itself is.
    greeted: bool,
}

/// Every open connection's outbox. The server's [`EventSink`].
#[derive(Default)]
pub(crate) struct Outboxes {
    inner: Mutex<HashMap<ConnectionId, Outbox>>,
}

impl Outboxes {
    /// Starts tracking a connection. The receiver feeds its writer.
    pub(crate) fn register(&self, id: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.lock().insert(id, Outbox { tx, greeted: false });
        rx
    }

    /// Stops tracking a connection. Its writer stops once the queue drains.
    pub(crate) fn unregister(&self, id: ConnectionId) {
        self.lock().remove(&id);
    }

    /// Queues an event for one connection, outside any coordinator
    /// operation.
    pub(crate) fn reply(&self, id: ConnectionId, event: ServerEvent) {
        self.publish(vec![Outbound::to(id, event)], &HashSet::new());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Outbox>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for Outboxes {
    fn publish(&self, events: Vec<Outbound>, members: &HashSet<ConnectionId>) {
        let mut outboxes = self.lock();
        let mut stalled = Vec::new();

        for outbound in events {
            let is_welcome = matches!(outbound.event, ServerEvent::Welcome { .. });
            for (id, outbox) in outboxes.iter_mut() {
                if !outbound.audience.includes(*id, members.contains(id)) {
                    continue;
                }
                if !outbox.greeted {
                    // The Welcome snapshot is newer than anything skipped here.
                    if !is_welcome {
                        continue;
                    }
                    outbox.greeted = true;
                }
                match outbox.tx.try_send(outbound.event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => stalled.push(*id),
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(
                            connection_id = %id,
                            "dropping event for closed connection"
                        );
                    }
                }
            }
        }

        for id in stalled {
            if outboxes.remove(&id).is_some() {
                tracing::warn!(connection_id = %id, "outbox full, dropping connection");
            }
        }
    }
}

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<A: AddressResolver, C: Codec> {
    pub(crate) coordinator: Coordinator<Arc<Outboxes>, A>,
    pub(crate) outboxes: Arc<Outboxes>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

impl<A: AddressResolver, C: Codec> ServerState<A, C> {
    /// Pings go out three times per idle window.
    pub(crate) fn ping_interval(&self) -> Duration {
        (self.idle_timeout / 3).max(Duration::from_millis(1))
    }
}

/// Builder for configuring and starting a Loup-Garou server.
///
/// # Example
///
/// ```rust,ignore
/// use loupgarou::prelude::*;
///
/// let server = LoupGarouServer::builder()
///     .bind("0.0.0.0:3000")
///     .game_config(GameConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct LoupGarouServerBuilder<A: AddressResolver = NoDiscovery> {
    bind_addr: String,
    game_config: GameConfig,
    idle_timeout: Duration,
    resolver: A,
}

impl LoupGarouServerBuilder<NoDiscovery> {
    /// Creates a builder with default settings and no address discovery.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            game_config: GameConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            resolver: NoDiscovery,
        }
    }
}

impl Default for LoupGarouServerBuilder<NoDiscovery> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AddressResolver> LoupGarouServerBuilder<A> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets thresholds and the role catalog for every session.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    /// Sets how long a connection may stay silent before it is dropped.
    ///
    /// The server pings every connection three times per window.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how a new session's public address is discovered.
    pub fn resolver<R: AddressResolver>(self, resolver: R) -> LoupGarouServerBuilder<R> {
        LoupGarouServerBuilder {
            bind_addr: self.bind_addr,
            game_config: self.game_config,
            idle_timeout: self.idle_timeout,
            resolver,
        }
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<LoupGarouServer<A, JsonCodec>, LoupGarouError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let outboxes = Arc::new(Outboxes::default());
        let coordinator = Coordinator::new(self.game_config, Arc::clone(&outboxes))
            .with_resolver(self.resolver);

        let state = Arc::new(ServerState {
            coordinator,
            outboxes,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(LoupGarouServer { transport, state })
    }
}

/// A bound Loup-Garou server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LoupGarouServer<A: AddressResolver = NoDiscovery, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl LoupGarouServer {
    pub fn builder() -> LoupGarouServerBuilder {
        LoupGarouServerBuilder::new()
    }
}

impl<A, C> LoupGarouServer<A, C>
where
    A: AddressResolver,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted socket gets its own task, which runs the WebSocket
    /// handshake and then the connection handler.
    pub async fn run(mut self) -> Result<(), LoupGarouError> {
        tracing::info!(
            min_players = self.state.coordinator.config().min_players,
            max_players = self.state.coordinator.config().max_players,
            "Loup-Garou server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let connection_id = pending.id();
                        let conn = match pending.establish().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(
                                    %connection_id,
                                    error = %e,
                                    "handshake failed"
                                );
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                %connection_id,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
