//! Redis list backend
//!
//! Producers `LPUSH` onto the list and the consumer `BRPOP`s from the
//! other end, which gives FIFO order for a single producer.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use super::JobQueue;
use crate::core::AgentResult;

/// Job queue backed by Redis lists
pub struct RedisQueue {
    url: String,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisQueue {
    /// Connect to Redis and verify the server answers
    ///
    /// Fails when the server cannot be reached; callers treat that as a
    /// fatal startup error.
    pub async fn connect(url: &str) -> AgentResult<Self> {
        tracing::info!("[RedisQueue] Connecting to {}", url);

        let client = redis::Client::open(url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        tracing::debug!("[RedisQueue] Server replied {}", pong);

        Ok(Self {
            url: url.to_string(),
            connection: RwLock::new(Some(connection)),
        })
    }

    /// URL this queue is connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("Queue connection to {} is closed", self.url))
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        let mut connection = self.connection().await?;
        let length: i64 = connection
            .lpush(queue, payload)
            .await
            .with_context(|| format!("LPUSH to {} failed", queue))?;
        tracing::debug!("[RedisQueue] Pushed to {} (length {})", queue, length);
        Ok(())
    }

    async fn pop_with_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        let mut connection = self.connection().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(queue)
            .arg(timeout.as_secs_f64())
            .query_async(&mut connection)
            .await
            .with_context(|| format!("BRPOP from {} failed", queue))?;
        Ok(popped.map(|(_, payload)| payload))
    }

    async fn close(&self) -> Result<()> {
        if self.connection.write().await.take().is_some() {
            tracing::info!("[RedisQueue] Closed connection to {}", self.url);
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue").field("url", &self.url).finish()
    }
}
