//! Behavior that periodically emits a random two-word message

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;

use super::behavior::Behavior;
use crate::core::Message;
use crate::runtime::AgentContext;

/// Vocabulary the random messages are drawn from
pub const VOCABULARY: &[&str] = &[
    "hello", "sun", "world", "space", "moon", "crypto", "sky", "ocean", "universe", "human",
];

/// Sends a random two-word text message to the outbox every `interval`
pub struct RandomTextBehavior {
    interval: Duration,
    last_acted: Mutex<Option<Instant>>,
}

impl RandomTextBehavior {
    /// Create a behavior that acts at most once per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_acted: Mutex::new(None),
        }
    }

    fn random_text() -> String {
        let mut rng = rand::rng();
        let words: Vec<&str> = (0..2)
            .filter_map(|_| VOCABULARY.choose(&mut rng).copied())
            .collect();
        words.join(" ")
    }
}

#[async_trait]
impl Behavior for RandomTextBehavior {
    fn name(&self) -> &str {
        "random-text"
    }

    async fn should_act(&self) -> bool {
        match *self.last_acted.lock().await {
            Some(at) => at.elapsed() >= self.interval,
            None => true,
        }
    }

    async fn act(&self, agent: &AgentContext) -> Result<()> {
        *self.last_acted.lock().await = Some(Instant::now());

        let text = Self::random_text();
        tracing::info!(agent = agent.name(), "[RandomText] Sending: {}", text);
        agent.send(Message::text(text))?;
        Ok(())
    }
}
