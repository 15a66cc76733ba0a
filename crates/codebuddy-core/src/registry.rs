//! Session registry: session id to the set of live connections.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::traits::{Connection, ConnectionId, SessionId};

type MembershipSet = HashMap<ConnectionId, Arc<dyn Connection>>;

/// Maps a session id to the connections currently subscribed to it.
///
/// Entries are created lazily on first join and dropped as soon as their
/// membership set becomes empty. The lock is held only for the map update or
/// copy, never while a caller writes to a connection.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, MembershipSet>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, MembershipSet>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, MembershipSet>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `connection` to the membership set for `session_id`.
    ///
    /// Returns `false` if the connection was already a member.
    pub fn join(&self, session_id: &str, connection: Arc<dyn Connection>) -> bool {
        let id = connection.id();
        let inserted = self
            .write()
            .entry(session_id.to_owned())
            .or_default()
            .insert(id, connection)
            .is_none();

        tracing::debug!(session_id, connection_id = %id, inserted, "registry join");
        inserted
    }

    /// Remove a connection from its membership set.
    ///
    /// Idempotent: returns `false` if the connection was not a member. The
    /// session entry is removed once its last member leaves.
    pub fn leave(&self, session_id: &str, connection_id: ConnectionId) -> bool {
        let mut sessions = self.write();
        let Some(members) = sessions.get_mut(session_id) else {
            return false;
        };

        let removed = members.remove(&connection_id).is_some();
        if members.is_empty() {
            sessions.remove(session_id);
            tracing::debug!(session_id, "registry entry dropped");
        }
        drop(sessions);

        if removed {
            tracing::debug!(session_id, %connection_id, "registry leave");
        }
        removed
    }

    /// Copy of the current members of `session_id`.
    ///
    /// Callers iterate the snapshot without holding any registry lock, so
    /// concurrent joins and leaves never observe a partially-updated set.
    #[must_use]
    pub fn snapshot_members(&self, session_id: &str) -> Vec<Arc<dyn Connection>> {
        self.read()
            .get(session_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `session_id` has no live members.
    #[must_use]
    pub fn is_empty(&self, session_id: &str) -> bool {
        !self.read().contains_key(session_id)
    }

    /// Number of live members of `session_id`.
    #[must_use]
    pub fn member_count(&self, session_id: &str) -> usize {
        self.read().get(session_id).map_or(0, HashMap::len)
    }

    /// Number of sessions with at least one member.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    /// Total members across all sessions.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }
}
