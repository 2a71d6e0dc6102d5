//! Handler that answers greetings

use anyhow::Result;
use async_trait::async_trait;

use super::contains_keyword;
use super::handler::MessageHandler;
use crate::core::{Message, MessageType};
use crate::runtime::AgentContext;

/// Logs every text message that says hello
#[derive(Debug, Default)]
pub struct GreetingHandler;

impl GreetingHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageHandler for GreetingHandler {
    fn name(&self) -> &str {
        "greeting"
    }

    fn supported_types(&self) -> &[MessageType] {
        &[MessageType::Text]
    }

    async fn can_handle(&self, message: &Message) -> bool {
        message
            .as_text()
            .is_some_and(|text| contains_keyword(text, "hello"))
    }

    async fn handle(&self, message: &Message, agent: &AgentContext) -> Result<()> {
        tracing::info!(agent = agent.name(), "[Greeting] Received greeting: {}", message);
        Ok(())
    }
}
