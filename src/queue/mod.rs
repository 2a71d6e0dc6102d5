//! Durable job queue
//!
//! This module provides:
//! - `JobQueue` trait - push / pop-with-timeout / close over named FIFO lists
//! - `RedisQueue` - Redis list backend (`LPUSH` + `BRPOP`)
//! - `InMemoryQueue` - Process-local backend for tests and single-process runs
//!
//! Delivery is at-least-once with no acknowledgment: a popped payload is
//! gone from the queue whether or not the consumer finishes with it.

mod memory;
mod redis_list;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use self::memory::InMemoryQueue;
pub use self::redis_list::RedisQueue;

/// Name of the list transfer jobs are pushed to
pub const DEFAULT_TRANSFER_QUEUE: &str = "crypto_transfers";

/// Trait for the durable queue service
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a payload to the named queue without waiting for a consumer
    async fn push(&self, queue: &str, payload: &str) -> Result<()>;

    /// Pop the oldest payload, waiting up to `timeout`
    ///
    /// Returns `None` when the timeout expires with the queue still empty.
    async fn pop_with_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;

    /// Close the connection; later calls fail
    async fn close(&self) -> Result<()>;
}
