//! Session orchestration and storage for collaborative coding.
//!
//! Provides:
//! - `SessionService` - Session CRUD and collaborator management
//! - Storage implementations (memory)

pub mod manager;
pub mod storage;

pub use manager::{ManagerError, SessionService};
