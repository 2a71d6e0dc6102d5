//! MessageHandler trait definition
//!
//! All handlers implement this trait so the registry can select them
//! through the same three capabilities.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{Message, MessageType};
use crate::runtime::AgentContext;

/// Trait for components that conditionally process one inbound message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Get the name of this handler (used in logs)
    fn name(&self) -> &str;

    /// Message types this handler declares support for
    fn supported_types(&self) -> &[MessageType];

    /// Check whether this handler wants the given message
    ///
    /// Only called for messages whose type is in `supported_types`.
    async fn can_handle(&self, message: &Message) -> bool;

    /// Process the message
    ///
    /// An error is logged by the dispatcher; the message still counts as
    /// handled and is not offered to other handlers.
    async fn handle(&self, message: &Message, agent: &AgentContext) -> Result<()>;
}
