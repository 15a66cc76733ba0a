//! Shared application state for HTTP and WebSocket handlers.

use std::sync::Arc;

use codebuddy_core::SessionStore;
use codebuddy_session::SessionService;

use crate::hub::CollabHub;

/// Handler state: the collaboration hub and the session service, both
/// backed by the same store.
pub struct AppState<S>
where
    S: SessionStore,
{
    /// Live collaboration registry and router.
    pub hub: Arc<CollabHub<S>>,
    /// Session CRUD.
    pub sessions: SessionService<S>,
}

impl<S> AppState<S>
where
    S: SessionStore,
{
    /// Create state sharing `store` between the hub and the session service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            hub: Arc::new(CollabHub::new(Arc::clone(&store))),
            sessions: SessionService::new(store),
        }
    }
}

impl<S> Clone for AppState<S>
where
    S: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            sessions: self.sessions.clone(),
        }
    }
}
