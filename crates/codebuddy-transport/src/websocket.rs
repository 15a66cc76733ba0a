//! WebSocket transport for the code and chat channels.

use std::sync::Arc;

use axum::{
    extract::{
        OriginalUri, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use codebuddy_core::{Connection, ConnectionId, SendError, SessionId, SessionStore, extract_session_id};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{protocol::Channel, state::AppState};

/// Write side of one WebSocket peer.
///
/// Frames are queued to a writer task that owns the socket sink. Once that
/// task stops (peer gone, socket error) the queue is closed and every further
/// `send` fails.
pub struct WsConnection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl WsConnection {
    /// Create a connection and the receiving end of its outbound queue.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, frame: &str) -> Result<(), SendError> {
        self.tx.send(frame.to_owned()).map_err(|_| SendError::Closed)
    }
}

/// Upgrade handler for `/ws/code/{session_id}`.
pub async fn code_ws_handler<S>(
    ws: WebSocketUpgrade,
    OriginalUri(uri): OriginalUri,
    State(state): State<AppState<S>>,
) -> Response
where
    S: SessionStore + 'static,
{
    upgrade(ws, Channel::Code, uri.path(), state)
}

/// Upgrade handler for `/ws/chat/{session_id}`.
pub async fn chat_ws_handler<S>(
    ws: WebSocketUpgrade,
    OriginalUri(uri): OriginalUri,
    State(state): State<AppState<S>>,
) -> Response
where
    S: SessionStore + 'static,
{
    upgrade(ws, Channel::Chat, uri.path(), state)
}

fn upgrade<S>(ws: WebSocketUpgrade, channel: Channel, path: &str, state: AppState<S>) -> Response
where
    S: SessionStore + 'static,
{
    // Unaddressable connections are refused before the handshake completes.
    let Some(session_id) = extract_session_id(path) else {
        tracing::warn!(%channel, path, "rejecting connection without session id");
        return (StatusCode::BAD_REQUEST, "missing session id").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, channel, session_id))
}

async fn handle_socket<S>(socket: WebSocket, state: AppState<S>, channel: Channel, session_id: SessionId)
where
    S: SessionStore + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut rx) = WsConnection::new();
    let connection: Arc<dyn Connection> = Arc::new(connection);
    let connection_id = connection.id();

    // Spawn task to forward queued frames to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    if !state.hub.open(channel, &session_id, Arc::clone(&connection)) {
        send_task.abort();
        return;
    }

    // Handle incoming frames in receipt order
    while let Some(msg) = receiver.next().await {
        let frame = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(data)) => {
                state
                    .hub
                    .route_bytes(channel, &session_id, connection.as_ref(), &data)
                    .await;
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(%channel, session_id = %session_id, %connection_id, "WebSocket error: {e}");
                break;
            }
        };

        state
            .hub
            .route(channel, &session_id, connection.as_ref(), &frame)
            .await;
    }

    state.hub.close(channel, &session_id, connection_id);
    send_task.abort();
}
