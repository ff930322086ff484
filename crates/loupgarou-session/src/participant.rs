//! Participants and the views of them that leave the server.

use loupgarou_protocol::{ConnectionId, SessionId};
use loupgarou_roles::Role;
use serde::{Deserialize, Serialize};

/// A connection bound to a display name within one session's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The only identity the session trusts. Unique within a roster.
    pub connection_id: ConnectionId,
    /// Display name. May collide with another participant's.
    pub name: String,
    pub alive: bool,
    /// Unset until roles are dealt, then never changes.
    pub role: Option<Role>,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, name: String) -> Self {
        Self {
            connection_id,
            name,
            alive: true,
            role: None,
        }
    }
}

/// One roster line as a specific viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub connection_id: ConnectionId,
    pub name: String,
    pub alive: bool,
    /// `None` unless the viewer is this participant or the creator.
    pub role: Option<Role>,
}

/// Who holds which role. Only ever sent to the creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub connection_id: ConnectionId,
    pub name: String,
    pub role: Role,
}

/// A session as listed to connections looking for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub creator_name: String,
    pub player_count: usize,
}
