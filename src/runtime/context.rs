//! AgentContext - the view of an agent handed to handlers and behaviors

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{AgentError, AgentResult, Message};

use super::channels::{InboxSender, OutboxSender};

/// Cheap, clonable handle to an agent's channels
///
/// Handlers receive this when they process a message and behaviors receive
/// it when they act. It can enqueue messages on either channel but cannot
/// reach the registries or the lifecycle.
#[derive(Clone, Debug)]
pub struct AgentContext {
    name: Arc<str>,
    inbox_tx: InboxSender,
    outbox_tx: OutboxSender,
    running: Arc<AtomicBool>,
}

impl AgentContext {
    pub(crate) fn new(
        name: impl Into<String>,
        inbox_tx: InboxSender,
        outbox_tx: OutboxSender,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            inbox_tx,
            outbox_tx,
            running,
        }
    }

    /// Name of the agent
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the agent's dispatch loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueue a message on the outbox for external delivery
    pub fn send(&self, message: Message) -> AgentResult<()> {
        self.outbox_tx
            .send(message)
            .map_err(|_| AgentError::ChannelClosed)
    }

    /// Enqueue a message on the inbox for dispatch
    pub fn deliver(&self, message: Message) -> AgentResult<()> {
        self.inbox_tx
            .send(message)
            .map_err(|_| AgentError::ChannelClosed)
    }
}
