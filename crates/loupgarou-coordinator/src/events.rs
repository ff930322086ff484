//! What the coordinator publishes: outbound events and who gets them.

use loupgarou_protocol::{Audience, ConnectionId, SessionId};
use loupgarou_roles::{NightActionKind, Role};
use loupgarou_session::{
    ParticipantView, Phase, RoleAssignment, Session, SessionSummary,
};
use serde::{Deserialize, Serialize};

/// A message the server sends to clients.
///
/// Internally tagged, so the JSON looks like
/// `{ "type": "PhaseChanged", "session_id": 3, "phase": "Day", "round": 1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    // -- Replies to the requesting connection --
    /// First message on every connection.
    Welcome {
        connection_id: ConnectionId,
        sessions: Vec<SessionSummary>,
    },
    SessionCreated {
        session_id: SessionId,
        /// `None` when address discovery is off or failed.
        public_address: Option<String>,
    },
    SessionJoined {
        session_id: SessionId,
    },
    SessionList {
        sessions: Vec<SessionSummary>,
    },
    NightActionRecorded {
        session_id: SessionId,
        action: NightActionKind,
        target: ConnectionId,
    },
    Error {
        code: u16,
        message: String,
    },

    // -- Notifications --
    RosterChanged {
        session_id: SessionId,
        participants: Vec<ParticipantView>,
    },
    AvailabilityChanged {
        sessions: Vec<SessionSummary>,
    },
    /// The recipient's own role.
    RoleAssigned {
        session_id: SessionId,
        role: Role,
    },
    /// The full mapping. Creator only.
    RolesAssigned {
        session_id: SessionId,
        assignments: Vec<RoleAssignment>,
    },
    PhaseChanged {
        session_id: SessionId,
        phase: Phase,
        round: u32,
    },
    Eliminated {
        session_id: SessionId,
        connection_id: ConnectionId,
        name: String,
    },
    /// Seer only.
    RoleRevealed {
        session_id: SessionId,
        connection_id: ConnectionId,
        name: String,
        role: Role,
    },
    SessionDeleted {
        session_id: SessionId,
    },
}

/// An event paired with the audience that must receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub audience: Audience,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn to(id: ConnectionId, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Connection(id),
            event,
        }
    }

    pub fn to_all(ids: Vec<ConnectionId>, event: ServerEvent) -> Self {
        Self {
            audience: Audience::Participants(ids),
            event,
        }
    }
}

/// One `RosterChanged` per participant, each with that viewer's role
/// visibility.
pub(crate) fn roster_events(session: &Session) -> Vec<Outbound> {
    session
        .participants()
        .iter()
        .map(|p| {
            Outbound::to(
                p.connection_id,
                ServerEvent::RosterChanged {
                    session_id: session.session_id(),
                    participants: session.roster_for(p.connection_id),
                },
            )
        })
        .collect()
}

/// Private role reveals, the creator's full mapping, and the first night.
pub(crate) fn start_events(
    session: &Session,
    assignments: Vec<RoleAssignment>,
) -> Vec<Outbound> {
    let session_id = session.session_id();
    let mut events: Vec<Outbound> = assignments
        .iter()
        .map(|a| {
            Outbound::to(
                a.connection_id,
                ServerEvent::RoleAssigned {
                    session_id,
                    role: a.role,
                },
            )
        })
        .collect();
    events.push(Outbound::to(
        session.creator(),
        ServerEvent::RolesAssigned {
            session_id,
            assignments,
        },
    ));
    events.extend(roster_events(session));
    events.push(phase_event(session));
    events
}

pub(crate) fn phase_event(session: &Session) -> Outbound {
    Outbound::to_all(
        session.connection_ids(),
        ServerEvent::PhaseChanged {
            session_id: session.session_id(),
            phase: session.phase(),
            round: session.round(),
        },
    )
}

pub(crate) fn deleted_event(session_id: SessionId) -> Outbound {
    Outbound {
        audience: Audience::Everyone,
        event: ServerEvent::SessionDeleted { session_id },
    }
}

pub(crate) fn availability_event(sessions: Vec<SessionSummary>) -> Outbound {
    Outbound {
        audience: Audience::Unjoined,
        event: ServerEvent::AvailabilityChanged { sessions },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_phase_changed_json_format() {
        let event = ServerEvent::PhaseChanged {
            session_id: SessionId(3),
            phase: Phase::Day,
            round: 1,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "PhaseChanged");
        assert_eq!(json["session_id"], 3);
        assert_eq!(json["phase"], "Day");
    }

    #[test]
    fn test_server_event_role_assigned_uses_display_name() {
        let event = ServerEvent::RoleAssigned {
            session_id: SessionId(1),
            role: Role::Werewolf,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["role"], "Loup-garou");
    }

    #[test]
    fn test_server_event_session_created_without_address() {
        let event = ServerEvent::SessionCreated {
            session_id: SessionId(1),
            public_address: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["public_address"].is_null());
    }

    #[test]
    fn test_roster_events_one_per_participant() {
        let mut session =
            Session::new(SessionId(1), ConnectionId::new(1), "Alice".into());
        session
            .add_participant(ConnectionId::new(2), "Bob".into(), 10)
            .unwrap();

        let events = roster_events(&session);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].audience, Audience::Connection(ConnectionId::new(1)));
        assert_eq!(events[1].audience, Audience::Connection(ConnectionId::new(2)));
    }
}
