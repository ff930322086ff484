//! The session registry: every live session, each behind its own lock.
//!
//! # Locking
//!
//! ```text
//! sessions:    RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>
//! memberships: Mutex<HashMap<ConnectionId, SessionId>>
//! ```
//!
//! The map lock is only held long enough to clone a handle out (or insert
//! or remove one), so operations on different sessions never wait on each
//! other. Everything that reads then writes a session runs under that
//! session's own mutex.
//!
//! Lock order is session → map → memberships. Nothing waits on a session
//! lock while holding the map or membership lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use loupgarou_protocol::{ConnectionId, SessionId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{Session, SessionSummary};

/// Shared handle to one session's critical section.
///
/// Callers clone it out of the registry, drop the registry lock, then
/// lock the session. Handles are short-lived: nothing keeps one past the
/// operation that fetched it.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns all live sessions and which connection belongs to which.
///
/// A connection belongs to at most one live session. The membership index
/// enforces that, and lets a disconnect find its session without scanning.
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    memberships: Mutex<HashMap<ConnectionId, SessionId>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
            memberships: Mutex::new(HashMap::new()),
        }
    }

    /// Hands out a session id never used before by this registry.
    pub fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a session and returns it already locked.
    ///
    /// The lock is taken before the session becomes visible, so the
    /// caller's first critical section always runs ahead of anyone who
    /// finds it in the map.
    pub async fn insert(&self, session: Session) -> OwnedMutexGuard<Session> {
        let session_id = session.session_id();
        let handle = Arc::new(Mutex::new(session));
        let guard = Arc::clone(&handle).lock_owned().await;
        self.sessions.write().await.insert(session_id, handle);
        tracing::debug!(%session_id, "session registered");
        guard
    }

    /// Looks up a session handle.
    pub async fn get(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Drops a session from the map.
    ///
    /// The caller must hold the session's lock and have moved it to
    /// `Ended`, so anyone still holding a stale handle sees it as gone.
    pub async fn remove(&self, session_id: SessionId) -> Option<SessionHandle> {
        let removed = self.sessions.write().await.remove(&session_id);
        if removed.is_some() {
            tracing::debug!(%session_id, "session unregistered");
        }
        removed
    }

    /// Cloned handles to every live session.
    pub async fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Summaries of sessions still accepting participants, oldest first.
    pub async fn joinable(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for handle in self.handles().await {
            let session = handle.lock().await;
            if session.phase().is_joinable() {
                summaries.push(session.summary());
            }
        }
        summaries.sort_by_key(|s| s.session_id);
        summaries
    }

    /// Records that `id` belongs to `session_id`.
    ///
    /// Check-and-insert is atomic, so two racing claims for the same
    /// connection cannot both succeed.
    ///
    /// # Errors
    /// Returns the session the connection already belongs to.
    pub async fn claim(
        &self,
        id: ConnectionId,
        session_id: SessionId,
    ) -> Result<(), SessionId> {
        let mut memberships = self.memberships.lock().await;
        if let Some(existing) = memberships.get(&id) {
            return Err(*existing);
        }
        memberships.insert(id, session_id);
        Ok(())
    }

    /// Removes `id`'s membership, returning the session it was in.
    ///
    /// Returns `Some` at most once per claim: a repeated release (for
    /// example a disconnect reported twice) gets `None`.
    pub async fn release(&self, id: ConnectionId) -> Option<SessionId> {
        self.memberships.lock().await.remove(&id)
    }

    /// Releases every listed connection that still belongs to `session_id`.
    pub async fn release_all(&self, ids: &[ConnectionId], session_id: SessionId) {
        let mut memberships = self.memberships.lock().await;
        for id in ids {
            if memberships.get(id) == Some(&session_id) {
                memberships.remove(id);
            }
        }
    }

    /// The session `id` currently belongs to, if any.
    pub async fn membership(&self, id: ConnectionId) -> Option<SessionId> {
        self.memberships.lock().await.get(&id).copied()
    }

    /// Every connection that currently belongs to a live session.
    pub async fn members(&self) -> HashSet<ConnectionId> {
        self.memberships.lock().await.keys().copied().collect()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_allocate_id_never_repeats() {
        let registry = SessionRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new();
        let id = registry.allocate_id();
        registry.insert(Session::new(id, cid(1), "Alice".into())).await;

        assert!(registry.get(id).await.is_some());
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(id).await.is_some());
        assert!(registry.get(id).await.is_none());
        assert!(registry.remove(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_claim_twice_returns_existing_session() {
        let registry = SessionRegistry::new();
        registry.claim(cid(1), SessionId(10)).await.unwrap();

        let second = registry.claim(cid(1), SessionId(11)).await;

        assert_eq!(second, Err(SessionId(10)));
        assert_eq!(registry.membership(cid(1)).await, Some(SessionId(10)));
    }

    #[tokio::test]
    async fn test_release_is_exactly_once() {
        let registry = SessionRegistry::new();
        registry.claim(cid(1), SessionId(10)).await.unwrap();

        assert_eq!(registry.release(cid(1)).await, Some(SessionId(10)));
        assert_eq!(registry.release(cid(1)).await, None);
    }

    #[tokio::test]
    async fn test_release_all_leaves_other_sessions_alone() {
        let registry = SessionRegistry::new();
        registry.claim(cid(1), SessionId(10)).await.unwrap();
        registry.claim(cid(2), SessionId(10)).await.unwrap();
        registry.claim(cid(3), SessionId(20)).await.unwrap();

        registry
            .release_all(&[cid(1), cid(2), cid(3)], SessionId(10))
            .await;

        assert_eq!(registry.membership(cid(1)).await, None);
        assert_eq!(registry.membership(cid(2)).await, None);
        assert_eq!(registry.membership(cid(3)).await, Some(SessionId(20)));
        assert_eq!(registry.members().await, HashSet::from([cid(3)]));
    }

    #[tokio::test]
    async fn test_insert_holds_lock_until_guard_drops() {
        let registry = SessionRegistry::new();
        let id = registry.allocate_id();
        let guard = registry.insert(Session::new(id, cid(1), "Alice".into())).await;

        let handle = registry.get(id).await.unwrap();
        assert!(handle.try_lock().is_err());

        drop(guard);
        assert!(handle.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_joinable_lists_lobby_sessions_only() {
        let registry = SessionRegistry::new();
        let open = registry.allocate_id();
        let closed = registry.allocate_id();
        registry.insert(Session::new(open, cid(1), "Alice".into())).await;
        let mut guard = registry
            .insert(Session::new(closed, cid(2), "Bob".into()))
            .await;
        guard.end();
        drop(guard);

        let listed = registry.joinable().await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session_id, open);
        assert_eq!(listed[0].creator_name, "Alice");
    }
}
