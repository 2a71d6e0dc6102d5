//! Handler registry with first-match dispatch
//!
//! Handlers are kept in registration order. For each message the registry
//! scans them linearly and invokes the first one that both declares the
//! message's type and accepts the message.

use std::sync::Arc;

use super::handler::MessageHandler;
use crate::core::Message;
use crate::runtime::AgentContext;

/// Result of dispatching one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler processed the message
    Handled {
        /// Name of the handler that ran
        handler: String,
    },

    /// The selected handler returned an error
    Failed {
        /// Name of the handler that ran
        handler: String,
        /// Error message
        error: String,
    },

    /// No handler matched; the message was dropped
    Unhandled,
}

/// Ordered collection of message handlers
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the lowest priority
    pub fn register<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.register_arc(Arc::new(handler));
    }

    /// Register a shared handler at the lowest priority
    pub fn register_arc(&mut self, handler: Arc<dyn MessageHandler>) {
        tracing::info!("[HandlerRegistry] Registering handler: {}", handler.name());
        self.handlers.push(handler);
    }

    /// Find the first handler that accepts the message
    pub async fn find(&self, message: &Message) -> Option<Arc<dyn MessageHandler>> {
        for handler in &self.handlers {
            if !handler.supported_types().contains(&message.kind()) {
                continue;
            }
            if handler.can_handle(message).await {
                return Some(handler.clone());
            }
        }
        None
    }

    /// Dispatch a message to the first matching handler
    pub async fn dispatch(&self, message: &Message, agent: &AgentContext) -> DispatchOutcome {
        let Some(handler) = self.find(message).await else {
            tracing::debug!(
                agent = agent.name(),
                message_id = %message.id(),
                "[HandlerRegistry] No handler for message, dropping"
            );
            return DispatchOutcome::Unhandled;
        };

        let name = handler.name().to_string();
        tracing::debug!(
            agent = agent.name(),
            message_id = %message.id(),
            "[HandlerRegistry] Dispatching to {}",
            name
        );

        match handler.handle(message, agent).await {
            Ok(()) => DispatchOutcome::Handled { handler: name },
            Err(e) => {
                tracing::error!(
                    agent = agent.name(),
                    message_id = %message.id(),
                    "[HandlerRegistry] Handler {} failed: {:#}",
                    name,
                    e
                );
                DispatchOutcome::Failed {
                    handler: name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Names of registered handlers, in priority order
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handler_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MessageType;
    use crate::runtime::Agent;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        name: &'static str,
        types: Vec<MessageType>,
        accepts: bool,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingHandler {
        fn new(name: &'static str, accepts: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    types: vec![MessageType::Text],
                    accepts,
                    calls: calls.clone(),
                    fail: false,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl MessageHandler for CountingHandler {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_types(&self) -> &[MessageType] {
            &self.types
        }

        async fn can_handle(&self, _message: &Message) -> bool {
            self.accepts
        }

        async fn handle(&self, _message: &Message, _agent: &AgentContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_first_registered_match_wins() {
        let agent = Agent::new("test");
        let (first, first_calls) = CountingHandler::new("first", true);
        let (second, second_calls) = CountingHandler::new("second", true);

        let mut registry = HandlerRegistry::new();
        registry.register(first);
        registry.register(second);

        let outcome = registry
            .dispatch(&Message::text("anything"), &agent.context())
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Handled {
                handler: "first".into()
            }
        );
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_skips_handlers_that_decline() {
        let agent = Agent::new("test");
        let (declines, declines_calls) = CountingHandler::new("declines", false);
        let (accepts, accepts_calls) = CountingHandler::new("accepts", true);

        let mut registry = HandlerRegistry::new();
        registry.register(declines);
        registry.register(accepts);

        registry
            .dispatch(&Message::text("anything"), &agent.context())
            .await;

        assert_eq!(declines_calls.load(Ordering::SeqCst), 0);
        assert_eq!(accepts_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_skipped() {
        let agent = Agent::new("test");
        let (text_only, calls) = CountingHandler::new("text-only", true);

        let mut registry = HandlerRegistry::new();
        registry.register(text_only);

        let outcome = registry
            .dispatch(
                &Message::structured(serde_json::json!({"k": "v"})),
                &agent.context(),
            )
            .await;

        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_counts_as_handled() {
        let agent = Agent::new("test");
        let (mut failing, failing_calls) = CountingHandler::new("failing", true);
        failing.fail = true;
        let (fallback, fallback_calls) = CountingHandler::new("fallback", true);

        let mut registry = HandlerRegistry::new();
        registry.register(failing);
        registry.register(fallback);

        let outcome = registry
            .dispatch(&Message::text("anything"), &agent.context())
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed { handler, .. } if handler == "failing"));
        assert_eq!(failing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }
}
