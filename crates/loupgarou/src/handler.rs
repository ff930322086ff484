//! Per-connection handler: registration, request routing, and cleanup.
//!
//! Each upgraded connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the outbox, spawn the writer task, queue `Welcome`
//!   2. Loop: decode requests → coordinator, which publishes the events
//!   3. On exit the guard unregisters and reports the disconnect
//!
//! The writer pings the client. A connection that sends nothing, not even
//! a pong, for the idle timeout is closed, and so is one whose writer has
//! stopped.

use std::sync::Arc;

use loupgarou_coordinator::{AddressResolver, ServerEvent};
use loupgarou_protocol::{Codec, ConnectionId};
use loupgarou_roles::NightActionKind;
use loupgarou_session::SessionError;
use loupgarou_transport::{Connection, Frame, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::server::ServerState;
use crate::wire::ClientRequest;
use crate::LoupGarouError;

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// cleanup is spawned.
struct ConnectionGuard<A: AddressResolver, C: Codec> {
    connection_id: ConnectionId,
    state: Arc<ServerState<A, C>>,
}

impl<A: AddressResolver, C: Codec> Drop for ConnectionGuard<A, C> {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        self.state.outboxes.unregister(connection_id);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if state.coordinator.leave_or_disconnect(connection_id).await {
                let live_sessions = state.coordinator.session_count().await;
                tracing::debug!(
                    %connection_id,
                    live_sessions,
                    "disconnect processed"
                );
            }
        });
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), LoupGarouError>
where
    A: AddressResolver,
    C: Codec,
{
    let connection_id = conn.id();
    let conn = Arc::new(conn);
    tracing::info!(%connection_id, "connection opened");

    let rx = state.outboxes.register(connection_id);
    let _guard = ConnectionGuard {
        connection_id,
        state: Arc::clone(&state),
    };
    let mut writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));
    state.coordinator.welcome(connection_id).await;

    loop {
        let received = tokio::select! {
            received = tokio::time::timeout(state.idle_timeout, conn.recv()) => received,
            _ = &mut writer => {
                tracing::info!(%connection_id, "writer stopped, closing connection");
                break;
            }
        };

        let data = match received {
            Ok(Ok(Some(Frame::Data(data)))) => data,
            Ok(Ok(Some(Frame::Heartbeat))) => continue,
            Ok(Ok(None)) => {
                tracing::info!(%connection_id, "connection closed");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%connection_id, "connection timed out");
                break;
            }
        };

        match state.codec.decode::<ClientRequest>(&data) {
            Ok(request) => handle_request(&state, connection_id, request).await,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "undecodable request");
                error_reply(&state, connection_id, 400, format!("invalid request: {e}"));
            }
        }
    }

    writer.abort();
    Ok(())
}

/// Drains a connection's outbox onto the socket and keeps it pinged.
///
/// Stops when the outbox is unregistered or dropped for overflowing, or
/// when a write fails or takes longer than the idle timeout.
async fn write_events<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    mut rx: mpsc::Receiver<ServerEvent>,
) where
    A: AddressResolver,
    C: Codec,
{
    let connection_id = conn.id();
    let mut heartbeat = tokio::time::interval(state.ping_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    heartbeat.tick().await;

    loop {
        let written = tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let bytes = match state.codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%connection_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                tokio::time::timeout(state.idle_timeout, conn.send(&bytes)).await
            }
            _ = heartbeat.tick() => {
                tokio::time::timeout(state.idle_timeout, conn.ping()).await
            }
        };

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, error = %e, "send failed, stopping writer");
                break;
            }
            Err(_) => {
                tracing::info!(%connection_id, "send timed out, stopping writer");
                break;
            }
        }
    }
}

/// Runs one request through the coordinator. Successful operations
/// publish their own events; only rejections and list replies are queued
/// here.
async fn handle_request<A, C>(
    state: &ServerState<A, C>,
    connection_id: ConnectionId,
    request: ClientRequest,
) where
    A: AddressResolver,
    C: Codec,
{
    let coordinator = &state.coordinator;

    let result = match request {
        ClientRequest::CreateSession { name } => coordinator
            .create_session(connection_id, &name)
            .await
            .map(drop),

        ClientRequest::JoinSession { session_id, name } => {
            coordinator
                .join_session(session_id, connection_id, &name)
                .await
        }

        ClientRequest::DeleteSession { session_id } => {
            coordinator.delete_session(session_id, connection_id).await
        }

        ClientRequest::LeaveSession => {
            coordinator.leave_or_disconnect(connection_id).await;
            list_sessions(state, connection_id).await;
            Ok(())
        }

        ClientRequest::ListSessions => {
            list_sessions(state, connection_id).await;
            Ok(())
        }

        ClientRequest::NightAction {
            session_id,
            action,
            target,
        } => match action.parse::<NightActionKind>() {
            Ok(kind) => {
                coordinator
                    .submit_night_action(session_id, connection_id, kind, target)
                    .await
            }
            Err(e) => Err(SessionError::from(e)),
        },

        ClientRequest::AdvancePhase { session_id } => coordinator
            .advance_phase(session_id, connection_id)
            .await
            .map(drop),
    };

    if let Err(e) = result {
        tracing::debug!(%connection_id, error = %e, "request rejected");
        error_reply(state, connection_id, e.code(), e.to_string());
    }
}

async fn list_sessions<A, C>(state: &ServerState<A, C>, connection_id: ConnectionId)
where
    A: AddressResolver,
    C: Codec,
{
    let sessions = state.coordinator.available_sessions().await;
    state
        .outboxes
        .reply(connection_id, ServerEvent::SessionList { sessions });
}

fn error_reply<A, C>(
    state: &ServerState<A, C>,
    connection_id: ConnectionId,
    code: u16,
    message: String,
) where
    A: AddressResolver,
    C: Codec,
{
    state
        .outboxes
        .reply(connection_id, ServerEvent::Error { code, message });
}
