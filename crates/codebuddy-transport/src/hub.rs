//! Collaboration hub: connection lifecycle and broadcast routing.
//!
//! One `SessionRegistry` per channel. Inbound frames are decoded, applied to
//! the session store where the kind requires it, then fanned out to a
//! snapshot of the session's members. A member whose write fails during a
//! fan-out is evicted on the spot.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use codebuddy_core::{Connection, ConnectionId, SessionRegistry, SessionStore, StorageError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::protocol::{self, Channel, ChatEvent, CodeEvent, ServerEvent};

/// Result of routing one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Fanned out to `delivered` members; `evicted` members failed the write.
    Broadcast { delivered: usize, evicted: usize },
    /// Unknown kind, dropped without reply.
    Ignored,
    /// Malformed frame, answered with an `error` to the sender only.
    Rejected,
}

/// Live membership counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub code_sessions: usize,
    pub chat_sessions: usize,
    pub code_connections: usize,
    pub chat_connections: usize,
}

/// Which members of a session receive a broadcast.
#[derive(Debug, Clone, Copy)]
enum Recipients {
    All,
    AllExcept(ConnectionId),
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Registry of live collaboration sessions for both channels.
pub struct CollabHub<S>
where
    S: SessionStore,
{
    store: Arc<S>,
    code: SessionRegistry,
    chat: SessionRegistry,
}

impl<S> CollabHub<S>
where
    S: SessionStore,
{
    /// Create a hub persisting code edits into `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            code: SessionRegistry::new(),
            chat: SessionRegistry::new(),
        }
    }

    /// Registry backing `channel`.
    #[must_use]
    pub const fn registry(&self, channel: Channel) -> &SessionRegistry {
        match channel {
            Channel::Code => &self.code,
            Channel::Chat => &self.chat,
        }
    }

    /// Register a freshly opened connection under `session_id`.
    ///
    /// Code-channel connections get `connection_established` before they
    /// join, so the ack is always their first frame. If that write fails the
    /// connection never joins. Returns whether the connection is registered.
    #[must_use]
    pub fn open(&self, channel: Channel, session_id: &str, connection: Arc<dyn Connection>) -> bool {
        let connection_id = connection.id();
        if channel == Channel::Code {
            let ack = ServerEvent::connection_established(session_id);
            if !self.reply(channel, session_id, connection.as_ref(), &ack) {
                return false;
            }
        }

        let registry = self.registry(channel);
        registry.join(session_id, connection);
        info!(%channel, session_id, %connection_id, members = registry.member_count(session_id), "connection opened");
        true
    }

    /// Deregister a closed or failed connection. Idempotent.
    pub fn close(&self, channel: Channel, session_id: &str, connection_id: ConnectionId) -> bool {
        let removed = self.registry(channel).leave(session_id, connection_id);
        if removed {
            info!(%channel, session_id, %connection_id, "connection closed");
        }
        removed
    }

    /// Handle one inbound frame from `sender`.
    pub async fn route(
        &self,
        channel: Channel,
        session_id: &str,
        sender: &dyn Connection,
        frame: &str,
    ) -> RouteOutcome {
        match channel {
            Channel::Code => self.route_code(session_id, sender, frame).await,
            Channel::Chat => self.route_chat(session_id, sender, frame),
        }
    }

    /// Handle one inbound binary frame from `sender`.
    ///
    /// Payloads that are not UTF-8 are rejected like any other malformed frame.
    pub async fn route_bytes(
        &self,
        channel: Channel,
        session_id: &str,
        sender: &dyn Connection,
        payload: &[u8],
    ) -> RouteOutcome {
        match std::str::from_utf8(payload) {
            Ok(frame) => self.route(channel, session_id, sender, frame).await,
            Err(e) => self.reject(channel, session_id, sender, &protocol::ProtocolError::from(e)),
        }
    }

    async fn route_code(&self, session_id: &str, sender: &dyn Connection, frame: &str) -> RouteOutcome {
        let event: CodeEvent = match protocol::decode(frame) {
            Ok(event) => event,
            Err(e) => return self.reject(Channel::Code, session_id, sender, &e),
        };

        match &event {
            CodeEvent::CodeChange {
                filename, content, ..
            } => self.persist(session_id, filename, content).await,
            CodeEvent::FileCreate { filename, .. } => self.persist(session_id, filename, "").await,
            CodeEvent::CursorPosition { .. } | CodeEvent::FileDelete { .. } => {}
            CodeEvent::Unknown => {
                debug!(session_id, "ignoring unknown code event");
                return RouteOutcome::Ignored;
            }
        }

        self.broadcast(Channel::Code, session_id, &event, Recipients::AllExcept(sender.id()))
    }

    fn route_chat(&self, session_id: &str, sender: &dyn Connection, frame: &str) -> RouteOutcome {
        let event: ChatEvent = match protocol::decode(frame) {
            Ok(event) => event,
            Err(e) => return self.reject(Channel::Chat, session_id, sender, &e),
        };

        let (outbound, recipients) = match event {
            ChatEvent::ChatMessage {
                user_id,
                username,
                content,
            } => (
                ServerEvent::ChatMessage {
                    user_id,
                    username,
                    content,
                    timestamp: now_millis(),
                },
                Recipients::All,
            ),
            ChatEvent::UserTyping {
                user_id,
                username,
                is_typing,
            } => (
                ServerEvent::UserTyping {
                    user_id,
                    username,
                    is_typing,
                },
                Recipients::AllExcept(sender.id()),
            ),
            ChatEvent::Unknown => {
                debug!(session_id, "ignoring unknown chat event");
                return RouteOutcome::Ignored;
            }
        };

        self.broadcast(Channel::Chat, session_id, &outbound, recipients)
    }

    /// Best-effort write of one file. A missing session or failing store never
    /// blocks the broadcast.
    async fn persist(&self, session_id: &str, filename: &str, content: &str) {
        match self.store.update_content(session_id, filename, content).await {
            Ok(_) => debug!(session_id, filename, "file content persisted"),
            Err(StorageError::NotFound(_)) => {
                debug!(session_id, filename, "session not stored, edit kept live only");
            }
            Err(e) => warn!(session_id, filename, error = %e, "failed to persist file content"),
        }
    }

    fn reject(
        &self,
        channel: Channel,
        session_id: &str,
        sender: &dyn Connection,
        err: &protocol::ProtocolError,
    ) -> RouteOutcome {
        warn!(%channel, session_id, connection_id = %sender.id(), error = %err, "malformed frame");
        self.reply(channel, session_id, sender, &ServerEvent::decode_error(channel, err));
        RouteOutcome::Rejected
    }

    /// Write one event to a single connection, evicting it on failure.
    fn reply(
        &self,
        channel: Channel,
        session_id: &str,
        connection: &dyn Connection,
        event: &ServerEvent,
    ) -> bool {
        let frame = match protocol::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%channel, error = %e, "failed to serialize reply");
                return false;
            }
        };

        if connection.send(&frame).is_ok() {
            return true;
        }
        warn!(%channel, session_id, connection_id = %connection.id(), "reply failed, dropping connection");
        self.registry(channel).leave(session_id, connection.id());
        false
    }

    fn broadcast<E: Serialize>(
        &self,
        channel: Channel,
        session_id: &str,
        event: &E,
        recipients: Recipients,
    ) -> RouteOutcome {
        let frame = match protocol::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%channel, session_id, error = %e, "failed to serialize event");
                return RouteOutcome::Ignored;
            }
        };

        let registry = self.registry(channel);
        let (mut delivered, mut evicted) = (0, 0);
        for member in registry.snapshot_members(session_id) {
            if let Recipients::AllExcept(excluded) = recipients {
                if member.id() == excluded {
                    continue;
                }
            }
            if member.send(&frame).is_ok() {
                delivered += 1;
            } else if registry.leave(session_id, member.id()) {
                evicted += 1;
                warn!(%channel, session_id, connection_id = %member.id(), "write failed, evicted stale member");
            }
        }

        debug!(%channel, session_id, delivered, evicted, "broadcast event");
        RouteOutcome::Broadcast { delivered, evicted }
    }

    /// Current session and connection counts.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            code_sessions: self.code.session_count(),
            chat_sessions: self.chat.session_count(),
            code_connections: self.code.connection_count(),
            chat_connections: self.chat.connection_count(),
        }
    }
}
