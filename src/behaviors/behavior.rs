//! Behavior trait definition

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::runtime::AgentContext;

/// How often a behavior is polled when it does not say otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest poll interval the agent honors; shorter ones are raised to it
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Trait for components that act autonomously on their own schedule
///
/// The agent polls each behavior every `poll_interval()`: first
/// `should_act()`, then `act()` if it returned true.
#[async_trait]
pub trait Behavior: Send + Sync {
    /// Get the name of this behavior (used in logs)
    fn name(&self) -> &str;

    /// How often the agent polls this behavior (at least `MIN_POLL_INTERVAL`)
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Check whether the behavior wants to act now
    async fn should_act(&self) -> bool;

    /// Act on behalf of the agent (send to the outbox, deliver to the inbox)
    async fn act(&self, agent: &AgentContext) -> Result<()>;
}
