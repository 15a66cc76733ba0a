//! REST session surface, driven through the router without a socket.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use codebuddy_session::storage::MemoryStorage;
use codebuddy_transport::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    create_router(AppState::new(Arc::new(MemoryStorage::new())))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, name: &str, owner: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "name": name, "ownerId": owner, "language": "java" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = app();
    let id = create(&app, "demo", "alice").await;

    let (status, body) = call(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ownerId"], "alice");
    assert_eq!(body["active"], true);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/sessions/{id}/code"),
        Some(json!({ "filename": "Main.java", "content": "class Main {}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"]["Main.java"], "class Main {}");

    let (status, body) = call(&app, Method::PUT, &format!("/api/sessions/{id}/deactivate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (_, active) = call(&app, Method::GET, "/api/sessions/active", None).await;
    assert_eq!(active, json!([]));

    let (status, _) = call(&app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collaborators_and_user_sessions() {
    let app = app();
    let shared = create(&app, "shared", "alice").await;
    create(&app, "private", "carol").await;

    let uri = format!("/api/sessions/{shared}/collaborators");
    for _ in 0..2 {
        let (status, body) = call(&app, Method::POST, &uri, Some(json!({ "userId": "bob" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["collaborators"], json!(["bob"]));
    }

    let (_, sessions) = call(&app, Method::GET, "/api/sessions/user/bob", None).await;
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], shared.as_str());
}

#[tokio::test]
async fn test_missing_session_is_not_found() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/sessions/nope/code",
        Some(json!({ "filename": "Main.java", "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = call(&app, Method::PUT, "/api/sessions/nope/deactivate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_owner_is_bad_request() {
    let app = app();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "name": "demo", "ownerId": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_start_empty() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/collab/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "codeSessions": 0, "chatSessions": 0, "codeConnections": 0, "chatConnections": 0 })
    );
}
