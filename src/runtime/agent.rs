//! Agent - owns the channels, the registries and the dispatch loop
//!
//! The `Agent` is responsible for:
//! - Creating its inbox and outbox channels
//! - Holding the handler and behavior registries
//! - Running the dispatch loop and the behavior tasks between `start` and `stop`
//! - Letting in-flight work finish when stopped

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::behaviors::{Behavior, BehaviorRegistry};
use crate::core::{AgentError, AgentResult, AgentStatus, Message};
use crate::handlers::{HandlerRegistry, MessageHandler};

use super::channels::{create_agent_channels, InboxReceiver, OutboxReceiver};
use super::context::AgentContext;

/// An autonomous agent
///
/// # Example
///
/// ```ignore
/// let mut agent = Agent::new("alice")
///     .with_handler(GreetingHandler::new())
///     .with_behavior(RandomTextBehavior::new(Duration::from_secs(10)));
///
/// let mut outbox = agent.take_outbox().unwrap();
/// agent.start()?;
/// agent.deliver(Message::text("hello there"))?;
/// // ...
/// agent.stop().await?;
/// ```
pub struct Agent {
    /// Name of this agent
    name: String,

    /// Channel view shared with handlers and behaviors
    context: AgentContext,

    /// Inbox receiver while stopped; moved into the dispatch task while running
    inbox_rx: Option<InboxReceiver>,

    /// Outbox receiver until an external consumer takes it
    outbox_rx: Option<OutboxReceiver>,

    /// Handlers in priority order
    handlers: Arc<HandlerRegistry>,

    /// Periodic behaviors
    behaviors: BehaviorRegistry,

    /// Shared running flag (also visible through `AgentContext`)
    running: Arc<AtomicBool>,

    /// Cancellation for the current run
    cancel: Option<CancellationToken>,

    /// Dispatch task; hands the inbox back when it exits
    dispatch_task: Option<JoinHandle<InboxReceiver>>,

    /// One task per behavior
    behavior_tasks: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Create a stopped agent with empty registries
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (inbox_tx, inbox_rx, outbox_tx, outbox_rx) = create_agent_channels();
        let running = Arc::new(AtomicBool::new(false));
        let context = AgentContext::new(name.clone(), inbox_tx, outbox_tx, running.clone());

        Self {
            name,
            context,
            inbox_rx: Some(inbox_rx),
            outbox_rx: Some(outbox_rx),
            handlers: Arc::new(HandlerRegistry::new()),
            behaviors: BehaviorRegistry::new(),
            running,
            cancel: None,
            dispatch_task: None,
            behavior_tasks: Vec::new(),
        }
    }

    /// Add a handler (builder style)
    pub fn with_handler<H: MessageHandler + 'static>(mut self, handler: H) -> Self {
        if let Err(e) = self.register_handler(handler) {
            tracing::warn!("[Agent] {}: {}", self.name, e);
        }
        self
    }

    /// Add a behavior (builder style)
    pub fn with_behavior<B: Behavior + 'static>(mut self, behavior: B) -> Self {
        if let Err(e) = self.register_behavior(behavior) {
            tracing::warn!("[Agent] {}: {}", self.name, e);
        }
        self
    }

    /// Register a handler at the lowest priority
    ///
    /// Registries are frozen while the agent is running.
    pub fn register_handler<H: MessageHandler + 'static>(&mut self, handler: H) -> AgentResult<()> {
        if self.is_running() {
            return Err(AgentError::AgentAlreadyRunning(self.name.clone()));
        }
        let registry = Arc::get_mut(&mut self.handlers)
            .ok_or_else(|| AgentError::AgentAlreadyRunning(self.name.clone()))?;
        registry.register(handler);
        Ok(())
    }

    /// Register a behavior
    pub fn register_behavior<B: Behavior + 'static>(&mut self, behavior: B) -> AgentResult<()> {
        if self.is_running() {
            return Err(AgentError::AgentAlreadyRunning(self.name.clone()));
        }
        self.behaviors.register(behavior);
        Ok(())
    }

    /// Get the agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a clonable view of this agent's channels
    pub fn context(&self) -> AgentContext {
        self.context.clone()
    }

    /// Get the handler registry
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Get the behavior registry
    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    /// Take the outbox receiver
    ///
    /// There is a single consumer; later calls return `None`.
    pub fn take_outbox(&mut self) -> Option<OutboxReceiver> {
        self.outbox_rx.take()
    }

    /// Check if the dispatch loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current lifecycle status
    pub fn status(&self) -> AgentStatus {
        if self.is_running() {
            AgentStatus::Running
        } else {
            AgentStatus::Stopped
        }
    }

    /// Enqueue a message on the outbox for external delivery
    pub fn send(&self, message: Message) -> AgentResult<()> {
        self.context.send(message)
    }

    /// Enqueue an inbound message for dispatch
    pub fn deliver(&self, message: Message) -> AgentResult<()> {
        self.context.deliver(message)
    }

    /// Start the dispatch loop and the behavior tasks
    pub fn start(&mut self) -> AgentResult<()> {
        if self.is_running() {
            return Err(AgentError::AgentAlreadyRunning(self.name.clone()));
        }
        let inbox = self
            .inbox_rx
            .take()
            .ok_or_else(|| AgentError::other(format!("Inbox of {} is unavailable", self.name)))?;

        let cancel = CancellationToken::new();
        self.running.store(true, Ordering::SeqCst);

        self.dispatch_task = Some(tokio::spawn(dispatch_loop(
            self.handlers.clone(),
            self.context.clone(),
            inbox,
            cancel.clone(),
        )));
        self.behavior_tasks = self.behaviors.spawn_all(&self.context, &cancel);
        self.cancel = Some(cancel);

        tracing::info!(
            "[Agent] {} started ({} handlers, {} behaviors)",
            self.name,
            self.handlers.len(),
            self.behaviors.len()
        );
        Ok(())
    }

    /// Stop the agent
    ///
    /// Waits for the handler or behavior currently executing to finish.
    /// Messages still waiting in the inbox are kept for the next `start`.
    /// Stopping a stopped agent is a no-op.
    pub async fn stop(&mut self) -> AgentResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!("[Agent] {} stopping", self.name);

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        let mut result = Ok(());

        if let Some(task) = self.dispatch_task.take() {
            match task.await {
                Ok(inbox) => self.inbox_rx = Some(inbox),
                Err(e) => {
                    tracing::error!("[Agent] {} dispatch loop panicked: {}", self.name, e);
                    result = Err(AgentError::other(format!(
                        "Dispatch loop of {} panicked",
                        self.name
                    )));
                }
            }
        }

        for joined in futures::future::join_all(self.behavior_tasks.drain(..)).await {
            if let Err(e) = joined {
                tracing::error!("[Agent] {} behavior task panicked: {}", self.name, e);
            }
        }

        tracing::info!("[Agent] {} stopped", self.name);
        result
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("handlers", &self.handlers)
            .field("behaviors", &self.behaviors)
            .finish()
    }
}

async fn dispatch_loop(
    handlers: Arc<HandlerRegistry>,
    agent: AgentContext,
    mut inbox: InboxReceiver,
    cancel: CancellationToken,
) -> InboxReceiver {
    tracing::debug!("[Agent] {} dispatch loop entered", agent.name());

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = inbox.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        // Runs to completion even if cancellation fires meanwhile
        handlers.dispatch(&message, &agent).await;
    }

    tracing::debug!("[Agent] {} dispatch loop exited", agent.name());
    inbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MessageType;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    /// Records every text it handles
    struct Recorder {
        seen: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn supported_types(&self) -> &[MessageType] {
            &[MessageType::Text]
        }

        async fn can_handle(&self, _message: &Message) -> bool {
            true
        }

        async fn handle(&self, message: &Message, _agent: &AgentContext) -> Result<()> {
            let _ = self.seen.send(message.to_string());
            Ok(())
        }
    }

    /// Signals when it starts, then takes a while to finish
    struct Slow {
        started: Arc<Notify>,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MessageHandler for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn supported_types(&self) -> &[MessageType] {
            &[MessageType::Text]
        }

        async fn can_handle(&self, _message: &Message) -> bool {
            true
        }

        async fn handle(&self, _message: &Message, _agent: &AgentContext) -> Result<()> {
            self.started.notify_one();
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_agent_initialization() {
        let mut agent = Agent::new("TestAgent");

        assert_eq!(agent.name(), "TestAgent");
        assert!(agent.handlers().is_empty());
        assert!(agent.behaviors().is_empty());
        assert!(!agent.is_running());
        assert_eq!(agent.status(), AgentStatus::Stopped);
        assert!(agent.take_outbox().is_some());
        assert!(agent.take_outbox().is_none());
    }

    #[tokio::test]
    async fn test_dispatches_in_arrival_order() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let mut agent = Agent::new("ordered").with_handler(Recorder { seen: seen_tx });

        agent.start().unwrap();
        for text in ["one", "two", "three"] {
            agent.deliver(Message::text(text)).unwrap();
        }

        for expected in ["one", "two", "three"] {
            assert_eq!(seen_rx.recv().await.unwrap(), expected);
        }

        agent.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_handler() {
        let started = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));
        let mut agent = Agent::new("draining").with_handler(Slow {
            started: started.clone(),
            finished: finished.clone(),
        });

        agent.start().unwrap();
        agent.deliver(Message::text("work")).unwrap();
        started.notified().await;

        agent.stop().await.unwrap();

        assert!(finished.load(Ordering::SeqCst));
        assert!(!agent.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut agent = Agent::new("twice");
        agent.stop().await.unwrap();

        agent.start().unwrap();
        agent.stop().await.unwrap();
        agent.stop().await.unwrap();
        assert_eq!(agent.status(), AgentStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut agent = Agent::new("busy");
        agent.start().unwrap();

        let result = agent.start();
        assert!(matches!(result, Err(AgentError::AgentAlreadyRunning(_))));

        agent.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_registries_frozen_while_running() {
        let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
        let mut agent = Agent::new("frozen");
        agent.start().unwrap();

        let result = agent.register_handler(Recorder { seen: seen_tx.clone() });
        assert!(matches!(result, Err(AgentError::AgentAlreadyRunning(_))));

        agent.stop().await.unwrap();
        agent.register_handler(Recorder { seen: seen_tx }).unwrap();
        assert_eq!(agent.handlers().len(), 1);
    }

    #[tokio::test]
    async fn test_queued_messages_survive_restart() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let mut agent = Agent::new("restart").with_handler(Recorder { seen: seen_tx });

        agent.deliver(Message::text("early")).unwrap();
        agent.start().unwrap();
        assert_eq!(seen_rx.recv().await.unwrap(), "early");
        agent.stop().await.unwrap();

        agent.deliver(Message::text("while stopped")).unwrap();
        assert!(seen_rx.try_recv().is_err());

        agent.start().unwrap();
        assert_eq!(seen_rx.recv().await.unwrap(), "while stopped");
        agent.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_context_reflects_running_flag() {
        let mut agent = Agent::new("flag");
        let context = agent.context();
        assert!(!context.is_running());

        agent.start().unwrap();
        assert!(context.is_running());

        agent.stop().await.unwrap();
        assert!(!context.is_running());
    }
}
