//! Real-time collaboration transport.
//!
//! Provides:
//! - Wire protocol for the code and chat channels (JSON, `type`-tagged)
//! - `CollabHub` - connection lifecycle and broadcast routing
//! - WebSocket endpoints and REST session surface (feature: websocket)

pub mod hub;
pub mod protocol;
pub mod state;

#[cfg(feature = "websocket")]
pub mod rest;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use hub::{CollabHub, HubStats, RouteOutcome};
pub use protocol::{Channel, ChatEvent, CodeEvent, ServerEvent};
pub use state::AppState;

/// Create the full HTTP router: both WebSocket channels plus REST.
///
/// # Example
/// ```ignore
/// let state = AppState::new(Arc::new(MemoryStorage::new()));
/// let app = create_router(state);
/// ```
#[cfg(feature = "websocket")]
#[must_use]
pub fn create_router<S>(state: AppState<S>) -> axum::Router
where
    S: codebuddy_core::SessionStore + 'static,
{
    use axum::routing::get;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    axum::Router::new()
        .route("/ws/code/{session_id}", get(websocket::code_ws_handler::<S>))
        .route("/ws/chat/{session_id}", get(websocket::chat_ws_handler::<S>))
        .merge(rest::create_rest_router::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
