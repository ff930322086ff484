//! Requests clients send to the server.

use loupgarou_protocol::{ConnectionId, SessionId};
use serde::{Deserialize, Serialize};

/// A client request, one per WebSocket message.
///
/// Internally tagged: `{ "type": "JoinSession", "session_id": 1, "name": "Bob" }`.
/// Replies and notifications come back as `ServerEvent`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    CreateSession {
        name: String,
    },
    JoinSession {
        session_id: SessionId,
        name: String,
    },
    /// Creator only.
    DeleteSession {
        session_id: SessionId,
    },
    /// Leave the current session without closing the connection.
    LeaveSession,
    ListSessions,
    NightAction {
        session_id: SessionId,
        /// `kill`, `protect`, `inspect`, `heal`, `poison` or `mark`.
        action: String,
        #[serde(default)]
        target: Option<ConnectionId>,
    },
    /// Creator only. Night → Day or Day → Night.
    AdvancePhase {
        session_id: SessionId,
    },
}
