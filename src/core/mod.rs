//! Core types for the agent runtime
//!
//! This module provides the fundamental types used throughout the crate:
//! - `Message` / `MessageType` - Immutable payloads passed between components
//! - `AgentStatus` / `WorkerState` - Lifecycle states
//! - `AgentError` - Error types

pub mod error;
pub mod message;
pub mod state;

pub use error::{AgentError, AgentResult};
pub use message::{Message, MessageContent, MessageType};
pub use state::{AgentStatus, WorkerState};
