//! Core abstractions for collaborative coding sessions.
//!
//! This crate provides the shared building blocks:
//! - `SessionRegistry` - Session id to live connection membership
//! - `Connection` - Write side of one participant's channel
//! - `SessionStore` - Persistence trait for sessions and file contents
//! - `extract_session_id` - Session binding from a connection address

pub mod address;
pub mod registry;
pub mod traits;

pub use address::extract_session_id;
pub use registry::SessionRegistry;
pub use traits::{
    CodeSession, Connection, ConnectionId, NewSession, SendError, SessionFilter, SessionId,
    SessionStore, StorageError,
};
