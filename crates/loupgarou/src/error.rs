//! Unified error type for the Loup-Garou server.

use loupgarou_coordinator::AddressError;
use loupgarou_protocol::ProtocolError;
use loupgarou_session::SessionError;
use loupgarou_transport::TransportError;

/// Top-level error wrapping every layer's error type.
///
/// `?` converts sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum LoupGarouError {
    /// The listener or a client socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game request was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The address resolver could not be set up.
    #[error(transparent)]
    Address(#[from] AddressError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use loupgarou_protocol::SessionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Upgrade("bad request".into());
        let wrapped: LoupGarouError = err.into();
        assert!(matches!(wrapped, LoupGarouError::Transport(_)));
        assert!(wrapped.to_string().contains("bad request"));
    }

    #[test]
    fn test_from_protocol_error() {
        let json_err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let wrapped: LoupGarouError = ProtocolError::Decode(json_err).into();
        assert!(matches!(wrapped, LoupGarouError::Protocol(_)));
        assert!(wrapped.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let err = SessionError::SessionNotFound(SessionId(3));
        let wrapped: LoupGarouError = err.into();
        assert!(matches!(wrapped, LoupGarouError::Session(_)));
        assert_eq!(wrapped.to_string(), "session S-3 not found");
    }
}
