//! Error types for the session layer.

use loupgarou_protocol::{ConnectionId, SessionId};
use loupgarou_roles::RoleError;

use crate::Phase;

/// Errors returned by session operations.
///
/// Every variant is recoverable: it is reported to the connection that
/// made the request and nothing else happens. Validation errors are
/// raised before any session is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session does not exist (or has already ended).
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The connection is already a participant of this session.
    #[error("{0} already joined session {1}")]
    AlreadyJoined(ConnectionId, SessionId),

    /// The connection is a participant of a different live session.
    #[error("{0} is already in session {1}")]
    AlreadyInSession(ConnectionId, SessionId),

    /// The connection already owns or belongs to a live session.
    #[error("{0} already belongs to session {1}, leave it before creating another")]
    DuplicateCreation(ConnectionId, SessionId),

    /// No more participant slots.
    #[error("session {0} is full")]
    SessionFull(SessionId),

    /// The operation is not allowed in the session's current phase.
    #[error("operation not allowed during {0}")]
    InvalidPhase(Phase),

    /// The requester is not allowed to perform this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A night action was submitted without a target.
    #[error("night action requires a target")]
    NoTarget,

    /// The target is not a living participant of the session.
    #[error("target {0} not found")]
    TargetNotFound(ConnectionId),

    /// The display name is empty or whitespace.
    #[error("display name must not be empty")]
    EmptyName,

    /// The night action name is not recognized.
    #[error("unknown night action: {0}")]
    UnknownAction(String),
}

impl SessionError {
    /// Numeric code reported to clients alongside the message.
    ///
    /// 400 malformed input, 403 not allowed, 404 unknown session or target,
    /// 409 conflicts with current state.
    pub fn code(&self) -> u16 {
        match self {
            Self::EmptyName | Self::UnknownAction(_) | Self::NoTarget => 400,
            Self::Unauthorized(_) => 403,
            Self::SessionNotFound(_) | Self::TargetNotFound(_) => 404,
            Self::AlreadyJoined(..)
            | Self::AlreadyInSession(..)
            | Self::DuplicateCreation(..)
            | Self::SessionFull(_)
            | Self::InvalidPhase(_) => 409,
        }
    }
}

impl From<RoleError> for SessionError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::UnknownAction(name) => Self::UnknownAction(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_groups_error_kinds() {
        assert_eq!(SessionError::EmptyName.code(), 400);
        assert_eq!(SessionError::Unauthorized("x".into()).code(), 403);
        assert_eq!(SessionError::SessionNotFound(SessionId(1)).code(), 404);
        assert_eq!(SessionError::InvalidPhase(Phase::Day).code(), 409);
    }

    #[test]
    fn test_from_role_error_unknown_action() {
        let err: SessionError = RoleError::UnknownAction("steal".into()).into();
        assert_eq!(err, SessionError::UnknownAction("steal".into()));
        assert!(err.to_string().contains("steal"));
    }
}
