//! The session phase state machine.

use serde::{Deserialize, Serialize};

/// The phase a session is in.
///
/// ```text
/// Lobby ──(roles dealt)──→ Night ⇄ Day
///   │                        │      │
///   └────────────────────────┴──────┴──→ Ended
/// ```
///
/// - **Lobby**: accepting joins, roles not dealt yet.
/// - **Night**: role-gated actions are collected.
/// - **Day**: open discussion, no role-gated actions.
/// - **Ended**: terminal. The registry drops the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Night,
    Day,
    Ended,
}

impl Phase {
    /// Returns `true` if the session is accepting new participants.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` once roles are dealt and until the session ends.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Night | Self::Day)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::Night)
                | (Self::Night, Self::Day)
                | (Self::Day, Self::Night)
                | (Self::Lobby | Self::Night | Self::Day, Self::Ended)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Night => write!(f, "Night"),
            Self::Day => write!(f, "Day"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_transition_to_allows_only_the_lifecycle_edges() {
        assert!(Phase::Lobby.can_transition_to(Phase::Night));
        assert!(Phase::Night.can_transition_to(Phase::Day));
        assert!(Phase::Day.can_transition_to(Phase::Night));
        assert!(Phase::Day.can_transition_to(Phase::Ended));

        assert!(!Phase::Lobby.can_transition_to(Phase::Day));
        assert!(!Phase::Night.can_transition_to(Phase::Lobby));
        assert!(!Phase::Ended.can_transition_to(Phase::Night));
        assert!(!Phase::Ended.can_transition_to(Phase::Ended));
    }

    #[test]
    fn test_is_joinable_only_in_lobby() {
        assert!(Phase::Lobby.is_joinable());
        assert!(!Phase::Night.is_joinable());
        assert!(!Phase::Day.is_joinable());
        assert!(!Phase::Ended.is_joinable());
    }

    #[test]
    fn test_is_active() {
        assert!(!Phase::Lobby.is_active());
        assert!(Phase::Night.is_active());
        assert!(Phase::Day.is_active());
        assert!(!Phase::Ended.is_active());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Night.to_string(), "Night");
        assert_eq!(Phase::Ended.to_string(), "Ended");
    }
}
