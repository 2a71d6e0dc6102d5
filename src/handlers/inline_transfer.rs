//! Handler that performs transfers directly
//!
//! For deployments without a queue. The dispatch loop is blocked until the
//! receipt arrives, so prefer `TransferQueueHandler` when messages arrive
//! faster than blocks are mined.

use anyhow::Result;
use async_trait::async_trait;

use super::contains_keyword;
use super::handler::MessageHandler;
use super::transfer::DEFAULT_TRANSFER_KEYWORD;
use crate::core::{AgentResult, Message, MessageType};
use crate::runtime::AgentContext;
use crate::transfer::{short_address, TransferExecutor, TransferJob};

/// Executes a transfer for every matching message
pub struct InlineTransferHandler {
    executor: TransferExecutor,
    keyword: String,
    job: TransferJob,
}

impl InlineTransferHandler {
    /// Create a handler that executes copies of `job`
    pub fn new(executor: TransferExecutor, job: TransferJob) -> AgentResult<Self> {
        job.validate()?;
        Ok(Self {
            executor,
            keyword: DEFAULT_TRANSFER_KEYWORD.to_string(),
            job,
        })
    }

    /// Match a different keyword (case-insensitive)
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into().to_lowercase();
        self
    }
}

#[async_trait]
impl MessageHandler for InlineTransferHandler {
    fn name(&self) -> &str {
        "inline-transfer"
    }

    fn supported_types(&self) -> &[MessageType] {
        &[MessageType::Text]
    }

    async fn can_handle(&self, message: &Message) -> bool {
        message
            .as_text()
            .is_some_and(|text| contains_keyword(text, &self.keyword))
    }

    async fn handle(&self, _message: &Message, agent: &AgentContext) -> Result<()> {
        if let Err(e) = self.executor.execute(&self.job).await {
            tracing::error!(
                agent = agent.name(),
                "[InlineTransfer] Failed to transfer token from {} to {}: {:#}",
                short_address(&self.job.source_address),
                short_address(&self.job.target_address),
                e
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Agent;
    use crate::test_support::{sample_job, LedgerCall, MockLedger};
    use crate::transfer::FeePolicy;

    #[tokio::test]
    async fn test_handles_crypto_message_inline() {
        let ledger = MockLedger::new();
        let executor = TransferExecutor::new(ledger.connector(), FeePolicy::default());
        let handler = InlineTransferHandler::new(executor, sample_job()).unwrap();
        let agent = Agent::new("TestAgent");

        let message = Message::text("send some crypto");
        assert!(handler.can_handle(&message).await);

        handler.handle(&message, &agent.context()).await.unwrap();

        assert_eq!(ledger.count(LedgerCall::Submit), 1);
        assert_eq!(ledger.count(LedgerCall::AwaitReceipt), 1);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_contained() {
        let ledger = MockLedger::new().failing_balance();
        let executor = TransferExecutor::new(ledger.connector(), FeePolicy::default());
        let handler = InlineTransferHandler::new(executor, sample_job()).unwrap();
        let agent = Agent::new("TestAgent");

        let result = handler.handle(&Message::text("crypto"), &agent.context()).await;

        assert!(result.is_ok());
        assert_eq!(ledger.submit_count(), 0);
    }
}
