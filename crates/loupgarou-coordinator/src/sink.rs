//! Where finished events go.

use std::collections::HashSet;
use std::sync::Arc;

use loupgarou_protocol::ConnectionId;

use crate::events::Outbound;

/// Receives every batch of events the coordinator produces.
///
/// A batch about one session is published while that session is still
/// locked, so batches for the same session arrive in the order their
/// changes happened. Availability snapshots are published one at a time,
/// newest last. `publish` runs under those locks: implementations queue
/// and return, they never wait.
pub trait EventSink: Send + Sync + 'static {
    /// Queues `events` for their audiences.
    ///
    /// `members` holds every connection that belongs to a live session
    /// whenever the batch contains an [`Audience::Unjoined`] event, and is
    /// empty otherwise.
    ///
    /// [`Audience::Unjoined`]: loupgarou_protocol::Audience::Unjoined
    fn publish(&self, events: Vec<Outbound>, members: &HashSet<ConnectionId>);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn publish(&self, events: Vec<Outbound>, members: &HashSet<ConnectionId>) {
        (**self).publish(events, members);
    }
}
