//! In-memory session storage.

use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use codebuddy_core::{CodeSession, NewSession, SessionFilter, SessionId, SessionStore, StorageError};
use uuid::Uuid;

/// In-memory storage implementation.
///
/// Useful for development and single-process deployments.
/// Data is lost on restart.
pub struct MemoryStorage {
    sessions: RwLock<HashMap<SessionId, CodeSession>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn create(&self, new: NewSession) -> Result<CodeSession, StorageError> {
        let timestamp = now();
        let session = CodeSession {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            owner_id: new.owner_id,
            collaborators: Vec::new(),
            files: BTreeMap::new(),
            language: new.language,
            created_at: timestamp,
            updated_at: timestamp,
            active: true,
        };

        self.sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<CodeSession>, StorageError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(id)
            .cloned())
    }

    async fn save(&self, mut session: CodeSession) -> Result<CodeSession, StorageError> {
        session.updated_at = now();

        self.sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn list(&self, filter: SessionFilter) -> Result<Vec<CodeSession>, StorageError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let mut result: Vec<CodeSession> = sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();

        // Sort by created_at descending
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }

        Ok(result)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .remove(id);

        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        filename: &str,
        content: &str,
    ) -> Result<CodeSession, StorageError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_owned()))?;

        session.files.insert(filename.to_owned(), content.to_owned());
        session.updated_at = now();

        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session(owner: &str) -> NewSession {
        NewSession {
            name: "demo".into(),
            owner_id: owner.into(),
            language: "java".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = MemoryStorage::new();
        let created = storage.create(new_session("alice")).await.unwrap();

        assert!(created.active);
        assert!(created.files.is_empty());
        let fetched = storage.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(storage.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_content_last_write_wins() {
        let storage = MemoryStorage::new();
        let session = storage.create(new_session("alice")).await.unwrap();

        storage.update_content(&session.id, "Main.java", "a").await.unwrap();
        storage.update_content(&session.id, "Util.java", "u").await.unwrap();
        let updated = storage
            .update_content(&session.id, "Main.java", "b")
            .await
            .unwrap();

        assert_eq!(updated.files["Main.java"], "b");
        assert_eq!(updated.files["Util.java"], "u");
    }

    #[tokio::test]
    async fn test_update_content_missing_session() {
        let storage = MemoryStorage::new();
        let err = storage
            .update_content("nope", "Main.java", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_list_filter_and_delete() {
        let storage = MemoryStorage::new();
        let a = storage.create(new_session("alice")).await.unwrap();
        let b = storage.create(new_session("bob")).await.unwrap();

        let mut inactive = b.clone();
        inactive.active = false;
        storage.save(inactive).await.unwrap();

        let active = storage
            .list(SessionFilter {
                active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        storage.delete(&a.id).await.unwrap();
        storage.delete(&a.id).await.unwrap();
        assert_eq!(storage.list(SessionFilter::default()).await.unwrap().len(), 1);
    }
}
