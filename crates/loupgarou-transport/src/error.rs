//! Error types for the transport layer.

use crate::ConnectionId;

/// Failures moving frames between the server and its clients.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be opened.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A TCP connection could not be accepted.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The peer connected but never completed the WebSocket upgrade.
    #[error("websocket upgrade failed: {0}")]
    Upgrade(String),

    /// Writing a frame to the peer failed.
    #[error("send to {id} failed: {reason}")]
    Send { id: ConnectionId, reason: String },

    /// Reading from the peer failed.
    #[error("receive from {id} failed: {reason}")]
    Receive { id: ConnectionId, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_error_names_the_connection() {
        let err = TransportError::Send {
            id: ConnectionId::new(4),
            reason: "broken pipe".into(),
        };
        assert_eq!(err.to_string(), "send to conn-4 failed: broken pipe");
    }

    #[test]
    fn test_bind_error_keeps_io_source() {
        use std::error::Error;
        let err = TransportError::Bind {
            addr: "0.0.0.0:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("cannot listen on 0.0.0.0:1"));
    }
}
