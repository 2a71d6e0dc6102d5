//! Behavior registry

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::behavior::{Behavior, MIN_POLL_INTERVAL};
use crate::runtime::AgentContext;

/// Collection of periodic behaviors owned by an agent
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: Vec<Arc<dyn Behavior>>,
}

impl BehaviorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior
    pub fn register<B: Behavior + 'static>(&mut self, behavior: B) {
        self.register_arc(Arc::new(behavior));
    }

    /// Register a shared behavior
    pub fn register_arc(&mut self, behavior: Arc<dyn Behavior>) {
        tracing::info!("[BehaviorRegistry] Registering behavior: {}", behavior.name());
        self.behaviors.push(behavior);
    }

    /// Spawn one polling task per behavior
    ///
    /// Every task stops at its next tick once `cancel` fires. An `act` that
    /// is already running is allowed to finish.
    pub fn spawn_all(&self, agent: &AgentContext, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.behaviors
            .iter()
            .map(|behavior| {
                tokio::spawn(poll_behavior(
                    behavior.clone(),
                    agent.clone(),
                    cancel.clone(),
                ))
            })
            .collect()
    }

    /// Names of registered behaviors
    pub fn behavior_names(&self) -> Vec<&str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    /// Get the number of registered behaviors
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.behavior_names()).finish()
    }
}

async fn poll_behavior(behavior: Arc<dyn Behavior>, agent: AgentContext, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(behavior.poll_interval().max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !behavior.should_act().await {
            continue;
        }

        if let Err(e) = behavior.act(&agent).await {
            tracing::error!(
                agent = agent.name(),
                "[BehaviorRegistry] Behavior {} failed: {:#}",
                behavior.name(),
                e
            );
        }
    }

    tracing::debug!(agent = agent.name(), "[BehaviorRegistry] Behavior {} stopped", behavior.name());
}
