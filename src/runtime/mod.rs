//! Agent runtime and communication
//!
//! This module provides the infrastructure for running agents:
//! - `Agent` - Owns the channels and registries, runs the dispatch loop
//! - `AgentContext` - The view of an agent handed to handlers and behaviors
//! - Channel types for inbox/outbox communication
//!
//! The dispatch loop and every behavior run as separate tokio tasks and
//! stop cooperatively through a cancellation token.

pub mod agent;
pub mod channels;
pub mod context;

pub use agent::Agent;
pub use channels::{InboxReceiver, InboxSender, OutboxReceiver, OutboxSender};
pub use context::AgentContext;
