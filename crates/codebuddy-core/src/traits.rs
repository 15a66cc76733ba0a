//! Core traits for session storage and live connections.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session identifier.
///
/// Opaque to the collaboration layer; clients supply it in the connection address.
pub type SessionId = String;

/// Identifier assigned to a live connection for registry bookkeeping.
pub type ConnectionId = Uuid;

/// Persisted collaborative coding session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// User who created the session.
    pub owner_id: String,
    /// Users invited into the session (owner excluded).
    #[serde(default)]
    pub collaborators: Vec<String>,
    /// File contents keyed by filename.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Primary language of the session.
    pub language: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
    /// Whether the session still accepts collaborators.
    pub active: bool,
}

impl CodeSession {
    /// Whether `user_id` owns or collaborates on this session.
    #[must_use]
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.collaborators.iter().any(|c| c == user_id)
    }
}

/// Fields supplied when creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub name: String,
    pub owner_id: String,
    pub language: String,
}

/// Session filter for queries.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Only sessions with this activity flag.
    pub active: Option<bool>,
    /// Only sessions this user owns or collaborates on.
    pub participant: Option<String>,
    /// Limit results.
    pub limit: Option<usize>,
}

impl SessionFilter {
    /// Whether `session` passes every set criterion.
    #[must_use]
    pub fn matches(&self, session: &CodeSession) -> bool {
        if let Some(active) = self.active {
            if session.active != active {
                return false;
            }
        }
        if let Some(ref user_id) = self.participant {
            if !session.has_participant(user_id) {
                return false;
            }
        }
        true
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for session storage backends.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session.
    async fn create(&self, new: NewSession) -> Result<CodeSession, StorageError>;

    /// Get a session by ID.
    async fn get(&self, id: &str) -> Result<Option<CodeSession>, StorageError>;

    /// Replace a stored session, bumping `updated_at`.
    async fn save(&self, session: CodeSession) -> Result<CodeSession, StorageError>;

    /// List sessions, newest first.
    async fn list(&self, filter: SessionFilter) -> Result<Vec<CodeSession>, StorageError>;

    /// Remove a session. Removing an absent session is not an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Overwrite one file's content. Last write wins.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn update_content(
        &self,
        id: &str,
        filename: &str,
        content: &str,
    ) -> Result<CodeSession, StorageError>;
}

/// Connection send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("Connection closed")]
    Closed,
}

/// An open, message-oriented channel to one participant.
///
/// Implementations must not block in `send`: it either hands the frame to the
/// transport or reports that the peer can no longer accept writes.
pub trait Connection: Send + Sync {
    /// Registry key for this connection.
    fn id(&self) -> ConnectionId;

    /// Queue one serialized frame for delivery.
    ///
    /// # Errors
    /// Returns `SendError::Closed` once the peer stopped accepting writes.
    fn send(&self, frame: &str) -> Result<(), SendError>;
}
