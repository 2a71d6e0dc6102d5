//! Handler that queues token transfers
//!
//! Recognizes transfer-intent text, turns it into a `TransferJob` and pushes
//! it onto the durable queue. The chain is never contacted from here: once
//! the job is queued, the worker process owns it.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::contains_keyword;
use super::handler::MessageHandler;
use crate::core::{AgentResult, Message, MessageType};
use crate::queue::{JobQueue, DEFAULT_TRANSFER_QUEUE};
use crate::runtime::AgentContext;
use crate::transfer::{short_address, TransferJob};

/// Keyword that marks a message as a transfer request
pub const DEFAULT_TRANSFER_KEYWORD: &str = "crypto";

/// Queues one transfer job per matching message
pub struct TransferQueueHandler {
    queue: Arc<dyn JobQueue>,
    queue_name: String,
    keyword: String,
    job: TransferJob,
}

impl TransferQueueHandler {
    /// Create a handler that queues copies of `job`
    ///
    /// The job is validated up front so a misconfigured agent fails at
    /// startup rather than on every message.
    pub fn new(queue: Arc<dyn JobQueue>, job: TransferJob) -> AgentResult<Self> {
        job.validate()?;
        Ok(Self {
            queue,
            queue_name: DEFAULT_TRANSFER_QUEUE.to_string(),
            keyword: DEFAULT_TRANSFER_KEYWORD.to_string(),
            job,
        })
    }

    /// Push to a different queue
    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    /// Match a different keyword (case-insensitive)
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into().to_lowercase();
        self
    }

    /// Queue this handler pushes to
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl MessageHandler for TransferQueueHandler {
    fn name(&self) -> &str {
        "transfer-queue"
    }

    fn supported_types(&self) -> &[MessageType] {
        &[MessageType::Text]
    }

    async fn can_handle(&self, message: &Message) -> bool {
        message
            .as_text()
            .is_some_and(|text| contains_keyword(text, &self.keyword))
    }

    async fn handle(&self, message: &Message, agent: &AgentContext) -> Result<()> {
        let payload = match self.job.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(agent = agent.name(), "[TransferQueue] Could not encode job: {}", e);
                return Ok(());
            }
        };

        match self.queue.push(&self.queue_name, &payload).await {
            Ok(()) => tracing::info!(
                agent = agent.name(),
                message_id = %message.id(),
                amount = %self.job.amount,
                "[TransferQueue] Queued transfer {} -> {} on {}",
                short_address(&self.job.source_address),
                short_address(&self.job.target_address),
                self.queue_name
            ),
            Err(e) => tracing::error!(
                agent = agent.name(),
                message_id = %message.id(),
                "[TransferQueue] Failed to queue transfer on {}: {:#}",
                self.queue_name,
                e
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueue;
    use crate::runtime::Agent;
    use crate::test_support::sample_job;
    use std::time::Duration;

    struct BrokenQueue;

    #[async_trait]
    impl JobQueue for BrokenQueue {
        async fn push(&self, _queue: &str, _payload: &str) -> Result<()> {
            anyhow::bail!("connection reset")
        }

        async fn pop_with_timeout(&self, _queue: &str, _timeout: Duration) -> Result<Option<String>> {
            Ok(None)
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn handler(queue: Arc<dyn JobQueue>) -> TransferQueueHandler {
        TransferQueueHandler::new(queue, sample_job()).unwrap()
    }

    #[tokio::test]
    async fn test_keyword_predicate() {
        let handler = handler(Arc::new(InMemoryQueue::new()));

        for text in ["CRYPTO now", "send crypto", "Crypto", "cryptocurrency"] {
            assert!(handler.can_handle(&Message::text(text)).await, "{}", text);
        }
        for text in ["crypt", "hello world", "", "c r y p t o"] {
            assert!(!handler.can_handle(&Message::text(text)).await, "{}", text);
        }
    }

    #[tokio::test]
    async fn test_structured_messages_never_match() {
        let handler = handler(Arc::new(InMemoryQueue::new()));
        let message = Message::structured(serde_json::json!({"text": "crypto"}));
        assert!(!handler.can_handle(&message).await);
    }

    #[tokio::test]
    async fn test_custom_keyword() {
        let handler = handler(Arc::new(InMemoryQueue::new())).with_keyword("PAY");
        assert!(handler.can_handle(&Message::text("please pay me")).await);
        assert!(!handler.can_handle(&Message::text("crypto")).await);
    }

    #[tokio::test]
    async fn test_handle_pushes_exactly_one_job() {
        let queue = Arc::new(InMemoryQueue::new());
        let handler = handler(queue.clone());
        let agent = Agent::new("producer");

        handler
            .handle(&Message::text("send some crypto"), &agent.context())
            .await
            .unwrap();

        let queued = queue.contents(DEFAULT_TRANSFER_QUEUE).await;
        assert_eq!(queued.len(), 1);
        let job = TransferJob::from_json(&queued[0]).unwrap();
        assert_eq!(job, sample_job());
        assert_eq!(job.amount, 1);
    }

    #[tokio::test]
    async fn test_custom_queue_name() {
        let queue = Arc::new(InMemoryQueue::new());
        let handler = handler(queue.clone()).with_queue_name("payments");
        let agent = Agent::new("producer");

        handler
            .handle(&Message::text("crypto"), &agent.context())
            .await
            .unwrap();

        assert_eq!(queue.len("payments").await, 1);
        assert_eq!(queue.len(DEFAULT_TRANSFER_QUEUE).await, 0);
    }

    #[tokio::test]
    async fn test_push_failure_is_swallowed() {
        let handler = handler(Arc::new(BrokenQueue));
        let agent = Agent::new("producer");

        let result = handler.handle(&Message::text("crypto"), &agent.context()).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_invalid_job() {
        let mut job = sample_job();
        job.source_address = "0xA".into();
        assert!(TransferQueueHandler::new(Arc::new(InMemoryQueue::new()), job).is_err());
    }
}
