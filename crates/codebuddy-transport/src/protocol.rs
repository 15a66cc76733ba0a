//! Wire protocol for the code and chat channels.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound frames
//! are decoded once into a closed enum per channel; kinds a channel does not
//! know decode to `Unknown` and are dropped by the hub.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// The two independently addressed channels of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Code synchronization: edits, cursors, file lifecycle.
    Code,
    /// Chat messages and typing indicators.
    Chat,
}

impl Channel {
    /// Stable lowercase name, used in routes and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Chat => "chat",
        }
    }

    /// Prefix for `error` frames sent back on this channel.
    #[must_use]
    pub const fn error_prefix(self) -> &'static str {
        match self {
            Self::Code => "Error processing message",
            Self::Chat => "Error processing chat message",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event on the code channel, in either direction.
///
/// Relays re-serialize the decoded event unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CodeEvent {
    /// Full content of one file after a local edit.
    CodeChange {
        filename: String,
        content: String,
        user_id: String,
    },
    /// Caret moved.
    CursorPosition { user_id: String, line: u32, column: u32 },
    /// New empty file.
    FileCreate { filename: String, user_id: String },
    /// File removed from the workspace.
    FileDelete { filename: String, user_id: String },
    /// Any kind this channel does not handle.
    #[serde(other)]
    Unknown,
}

/// Inbound event on the chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    ChatMessage {
        user_id: String,
        username: String,
        content: String,
    },
    UserTyping {
        user_id: String,
        username: String,
        is_typing: bool,
    },
    #[serde(other)]
    Unknown,
}

/// Event originated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Handshake acknowledgement on the code channel.
    ConnectionEstablished { session_id: String, message: String },
    /// Chat message stamped with server receipt time (Unix epoch millis).
    ChatMessage {
        user_id: String,
        username: String,
        content: String,
        timestamp: i64,
    },
    /// Typing indicator relay.
    UserTyping {
        user_id: String,
        username: String,
        is_typing: bool,
    },
    /// Error reply, sent only to the connection that caused it.
    Error { message: String },
}

impl ServerEvent {
    /// Greeting sent to a freshly joined code-channel connection.
    #[must_use]
    pub fn connection_established(session_id: &str) -> Self {
        Self::ConnectionEstablished {
            session_id: session_id.to_owned(),
            message: "Connected to coding session".to_owned(),
        }
    }

    /// Error reply for a frame that failed to decode on `channel`.
    #[must_use]
    pub fn decode_error(channel: Channel, err: &ProtocolError) -> Self {
        Self::Error {
            message: format!("{}: {err}", channel.error_prefix()),
        }
    }
}

/// Protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Decode one inbound frame.
///
/// # Errors
/// Returns error if the frame is not JSON, lacks `type`, or a required field
/// of a known kind is missing or ill-typed.
pub fn decode<E: DeserializeOwned>(frame: &str) -> Result<E, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

/// Encode one outbound event.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode<E: Serialize>(event: &E) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_code_change_wire_format() {
        let frame = r#"{"type":"code_change","filename":"Main.java","content":"x","userId":"u1"}"#;
        let event: CodeEvent = decode(frame).unwrap();
        assert_eq!(
            event,
            CodeEvent::CodeChange {
                filename: "Main.java".into(),
                content: "x".into(),
                user_id: "u1".into(),
            }
        );

        let relayed: Value = serde_json::from_str(&encode(&event).unwrap()).unwrap();
        let original: Value = serde_json::from_str(frame).unwrap();
        assert_eq!(relayed, original);
    }

    #[test]
    fn test_unknown_kind_is_not_an_error() {
        let event: CodeEvent = decode(r#"{"type":"selection_change","userId":"u1"}"#).unwrap();
        assert_eq!(event, CodeEvent::Unknown);

        let event: ChatEvent = decode(r#"{"type":"code_change","filename":"a"}"#).unwrap();
        assert_eq!(event, ChatEvent::Unknown);
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let err = decode::<CodeEvent>(r#"{"type":"code_change","content":"x","userId":"u1"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("filename"));

        assert!(decode::<ChatEvent>(r#"{"type":"user_typing","userId":"u1","username":"a"}"#).is_err());
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(decode::<CodeEvent>("not json").is_err());
        assert!(decode::<CodeEvent>(r#"{"filename":"a"}"#).is_err());
        assert!(decode::<CodeEvent>(r#"{"type":"cursor_position","userId":"u","line":"1","column":2}"#).is_err());
    }

    #[test]
    fn test_server_event_wire_format() {
        let ack = serde_json::to_value(ServerEvent::connection_established("abc123")).unwrap();
        assert_eq!(
            ack,
            json!({
                "type": "connection_established",
                "sessionId": "abc123",
                "message": "Connected to coding session"
            })
        );

        let typing = serde_json::to_value(ServerEvent::UserTyping {
            user_id: "u1".into(),
            username: "ann".into(),
            is_typing: true,
        })
        .unwrap();
        assert_eq!(typing["isTyping"], true);
        assert_eq!(typing["type"], "user_typing");
    }

    #[test]
    fn test_decode_error_message_names_channel() {
        let err = decode::<ChatEvent>("{").unwrap_err();
        let ServerEvent::Error { message } = ServerEvent::decode_error(Channel::Chat, &err) else {
            panic!("Wrong event type");
        };
        assert!(message.starts_with("Error processing chat message: "));
    }
}
