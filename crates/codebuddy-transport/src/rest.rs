//! REST surface for session CRUD and live collaboration stats.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use codebuddy_core::{CodeSession, SessionStore};
use codebuddy_session::ManagerError;
use serde::Deserialize;
use serde_json::json;

use crate::{hub::HubStats, state::AppState};

/// API error mapped onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Manager(ManagerError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Manager(ManagerError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Manager(ManagerError::Storage(e)) => {
                tracing::error!("Storage failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCodeRequest {
    pub filename: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCollaboratorRequest {
    pub user_id: String,
}

async fn create_session<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<CodeSession> {
    let session = state
        .sessions
        .create_session(&req.name, &req.owner_id, &req.language)
        .await?;
    Ok(Json(session))
}

async fn get_session<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<String>,
) -> ApiResult<CodeSession> {
    state
        .sessions
        .get_session(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| ManagerError::NotFound(session_id).into())
}

async fn user_sessions<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<CodeSession>> {
    Ok(Json(state.sessions.user_sessions(&user_id).await?))
}

async fn active_sessions<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
) -> ApiResult<Vec<CodeSession>> {
    Ok(Json(state.sessions.active_sessions().await?))
}

async fn update_code<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateCodeRequest>,
) -> ApiResult<CodeSession> {
    let session = state
        .sessions
        .update_code(&session_id, &req.filename, &req.content)
        .await?;
    Ok(Json(session))
}

async fn add_collaborator<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<String>,
    Json(req): Json<AddCollaboratorRequest>,
) -> ApiResult<CodeSession> {
    let session = state
        .sessions
        .add_collaborator(&session_id, &req.user_id)
        .await?;
    Ok(Json(session))
}

async fn delete_session<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.delete_session(&session_id).await?;
    Ok(StatusCode::OK)
}

async fn deactivate_session<S: SessionStore + 'static>(
    State(state): State<AppState<S>>,
    Path(session_id): Path<String>,
) -> ApiResult<CodeSession> {
    Ok(Json(state.sessions.deactivate_session(&session_id).await?))
}

async fn collab_stats<S: SessionStore + 'static>(State(state): State<AppState<S>>) -> Json<HubStats> {
    Json(state.hub.stats())
}

/// Create the REST router.
///
/// Static segments (`/active`, `/user/{id}`) take precedence over `/{id}`.
#[must_use]
pub fn create_rest_router<S>() -> Router<AppState<S>>
where
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/sessions", post(create_session::<S>))
        .route("/api/sessions/active", get(active_sessions::<S>))
        .route("/api/sessions/user/{user_id}", get(user_sessions::<S>))
        .route(
            "/api/sessions/{session_id}",
            get(get_session::<S>).delete(delete_session::<S>),
        )
        .route("/api/sessions/{session_id}/code", put(update_code::<S>))
        .route(
            "/api/sessions/{session_id}/collaborators",
            post(add_collaborator::<S>),
        )
        .route(
            "/api/sessions/{session_id}/deactivate",
            put(deactivate_session::<S>),
        )
        .route("/api/collab/stats", get(collab_stats::<S>))
}
