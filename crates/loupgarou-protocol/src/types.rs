//! Identity and addressing types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use loupgarou_transport::ConnectionId;

/// A unique identifier for a game session.
///
/// Newtype over `u64` so a `SessionId` can never be passed where a
/// `ConnectionId` is expected. Serialized as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Who must receive an outbound event.
///
/// The coordinator resolves everything it knows about (session rosters)
/// into concrete connection ids. The two broad audiences depend on the set
/// of open connections, which only the transport owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ids")]
pub enum Audience {
    /// One specific connection.
    Connection(ConnectionId),

    /// A fixed list of connections, typically a session's roster.
    Participants(Vec<ConnectionId>),

    /// Every open connection that is not currently in a session.
    Unjoined,

    /// Every open connection.
    Everyone,
}

impl Audience {
    /// Returns `true` if a connection with the given membership status
    /// belongs to this audience.
    pub fn includes(&self, id: ConnectionId, in_session: bool) -> bool {
        match self {
            Self::Connection(target) => *target == id,
            Self::Participants(ids) => ids.contains(&id),
            Self::Unjoined => !in_session,
            Self::Everyone => true,
        }
    }
}
