// Core runtime types
pub mod core;
pub mod runtime;

// Message handling and periodic behaviors
pub mod behaviors;
pub mod handlers;

// Token transfer pipeline
pub mod ledger;
pub mod queue;
pub mod transfer;
pub mod worker;

// Process setup
pub mod config;
pub mod logging;

// Test doubles for unit and integration tests
pub mod test_support;

// Re-export commonly used types
pub use crate::core::{AgentError, AgentResult, Message, MessageContent, MessageType};
pub use crate::runtime::{Agent, AgentContext};
