//! Process-local queue backend

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::JobQueue;

/// In-memory job queue with the same semantics as the Redis backend
///
/// Also counts pops and tracks whether it was closed, which lets tests
/// observe how a consumer drives it.
#[derive(Default)]
pub struct InMemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    pushed: Notify,
    closed: AtomicBool,
    pops: AtomicUsize,
}

impl InMemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads waiting in the named queue
    pub async fn len(&self, queue: &str) -> usize {
        self.lists.lock().await.get(queue).map_or(0, VecDeque::len)
    }

    /// Snapshot of the named queue, oldest first
    pub async fn contents(&self, queue: &str) -> Vec<String> {
        self.lists
            .lock()
            .await
            .get(queue)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `pop_with_timeout` calls issued so far
    pub fn pop_count(&self) -> usize {
        self.pops.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn try_pop(&self, queue: &str) -> Option<String> {
        self.lists.lock().await.get_mut(queue)?.pop_front()
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        if self.is_closed() {
            bail!("Queue is closed");
        }
        self.lists
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn pop_with_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        if self.is_closed() {
            bail!("Queue is closed");
        }
        self.pops.fetch_add(1, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so a concurrent push is not missed
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_pop(queue).await {
                return Ok(Some(payload));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop(queue).await);
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
