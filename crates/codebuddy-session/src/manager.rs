//! Session service for managing collaborative coding sessions.

use std::sync::Arc;

use codebuddy_core::{CodeSession, NewSession, SessionFilter, SessionId, SessionStore, StorageError};

/// Session service error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl From<StorageError> for ManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

/// Session CRUD on top of a `SessionStore`.
///
/// The store is shared with the collaboration hub, which writes file
/// contents directly as edits arrive.
pub struct SessionService<S>
where
    S: SessionStore,
{
    storage: Arc<S>,
}

impl<S> Clone for SessionService<S>
where
    S: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S> SessionService<S>
where
    S: SessionStore,
{
    /// Create a new session service.
    #[must_use]
    pub const fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Shared handle to the underlying store.
    #[must_use]
    pub fn storage(&self) -> Arc<S> {
        Arc::clone(&self.storage)
    }

    async fn require(&self, session_id: &str) -> Result<CodeSession, ManagerError> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(session_id.to_owned()))
    }

    /// Create a new session owned by `owner_id`.
    ///
    /// # Errors
    /// Returns error if the name or owner is blank, or storage fails.
    pub async fn create_session(
        &self,
        name: &str,
        owner_id: &str,
        language: &str,
    ) -> Result<CodeSession, ManagerError> {
        if name.trim().is_empty() {
            return Err(ManagerError::Invalid("name is required".into()));
        }
        if owner_id.trim().is_empty() {
            return Err(ManagerError::Invalid("ownerId is required".into()));
        }

        let session = self
            .storage
            .create(NewSession {
                name: name.to_owned(),
                owner_id: owner_id.to_owned(),
                language: language.to_owned(),
            })
            .await?;

        tracing::info!(session_id = %session.id, owner_id, "session created");
        Ok(session)
    }

    /// Get a session by ID.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<CodeSession>, ManagerError> {
        Ok(self.storage.get(session_id).await?)
    }

    /// Sessions owned by or shared with `user_id`.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn user_sessions(&self, user_id: &str) -> Result<Vec<CodeSession>, ManagerError> {
        Ok(self
            .storage
            .list(SessionFilter {
                participant: Some(user_id.to_owned()),
                ..Default::default()
            })
            .await?)
    }

    /// Sessions still marked active.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn active_sessions(&self) -> Result<Vec<CodeSession>, ManagerError> {
        Ok(self
            .storage
            .list(SessionFilter {
                active: Some(true),
                ..Default::default()
            })
            .await?)
    }

    /// Overwrite one file of a session.
    ///
    /// # Errors
    /// Returns error if session not found or storage fails.
    pub async fn update_code(
        &self,
        session_id: &str,
        filename: &str,
        content: &str,
    ) -> Result<CodeSession, ManagerError> {
        if filename.is_empty() {
            return Err(ManagerError::Invalid("filename is required".into()));
        }
        Ok(self
            .storage
            .update_content(session_id, filename, content)
            .await?)
    }

    /// Add a collaborator. Adding an existing participant is a no-op.
    ///
    /// # Errors
    /// Returns error if session not found or storage fails.
    pub async fn add_collaborator(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<CodeSession, ManagerError> {
        let mut session = self.require(session_id).await?;
        if session.has_participant(user_id) {
            return Ok(session);
        }

        session.collaborators.push(user_id.to_owned());
        let session = self.storage.save(session).await?;
        tracing::info!(session_id, user_id, "collaborator added");
        Ok(session)
    }

    /// Delete a session.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ManagerError> {
        self.storage.delete(session_id).await?;
        tracing::info!(session_id, "session deleted");
        Ok(())
    }

    /// Mark a session inactive.
    ///
    /// # Errors
    /// Returns error if session not found or storage fails.
    pub async fn deactivate_session(&self, session_id: &str) -> Result<CodeSession, ManagerError> {
        let mut session = self.require(session_id).await?;
        session.active = false;
        Ok(self.storage.save(session).await?)
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn service() -> SessionService<MemoryStorage> {
        SessionService::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_create_requires_name_and_owner() {
        let service = service();
        assert!(matches!(
            service.create_session(" ", "alice", "java").await,
            Err(ManagerError::Invalid(_))
        ));
        assert!(matches!(
            service.create_session("demo", "", "java").await,
            Err(ManagerError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_add_collaborator_once() {
        let service = service();
        let session = service.create_session("demo", "alice", "java").await.unwrap();

        service.add_collaborator(&session.id, "bob").await.unwrap();
        let session = service.add_collaborator(&session.id, "bob").await.unwrap();
        assert_eq!(session.collaborators, vec!["bob".to_string()]);

        let owner_again = service.add_collaborator(&session.id, "alice").await.unwrap();
        assert_eq!(owner_again.collaborators.len(), 1);
    }

    #[tokio::test]
    async fn test_user_sessions_include_shared() {
        let service = service();
        let own = service.create_session("mine", "bob", "rust").await.unwrap();
        let shared = service.create_session("theirs", "alice", "java").await.unwrap();
        service.create_session("other", "carol", "go").await.unwrap();
        service.add_collaborator(&shared.id, "bob").await.unwrap();

        let mut ids: Vec<_> = service
            .user_sessions("bob")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        let mut expected = vec![own.id, shared.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_active() {
        let service = service();
        let session = service.create_session("demo", "alice", "java").await.unwrap();
        assert_eq!(service.active_sessions().await.unwrap().len(), 1);

        let session = service.deactivate_session(&session.id).await.unwrap();
        assert!(!session.active);
        assert!(service.active_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_maps_to_not_found() {
        let service = service();
        assert!(matches!(
            service.update_code("nope", "Main.java", "x").await,
            Err(ManagerError::NotFound(_))
        ));
        assert!(matches!(
            service.deactivate_session("nope").await,
            Err(ManagerError::NotFound(_))
        ));
        assert!(service.get_session("nope").await.unwrap().is_none());
    }
}
