//! Transfer worker process
//!
//! Pops transfer jobs from the Redis queue and executes them against the
//! ledger endpoint named in each job. Ctrl-C or SIGTERM lets the current
//! job finish, closes the queue connection and exits cleanly.

use std::sync::Arc;

use anyhow::{Context, Result};

use autonomous_agents::config::Settings;
use autonomous_agents::ledger::JsonRpcConnector;
use autonomous_agents::logging;
use autonomous_agents::queue::RedisQueue;
use autonomous_agents::transfer::TransferExecutor;
use autonomous_agents::worker::TransferWorker;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging()?;

    let settings = Settings::from_env()?;
    let fee_policy = settings.fee_policy()?;
    tracing::info!(
        queue = %settings.queue_name,
        multiplier_bps = fee_policy.multiplier_bps(),
        gas_limit = fee_policy.gas_limit(),
        "=== Transfer Worker Starting ==="
    );

    let queue = RedisQueue::connect(&settings.redis_url)
        .await
        .with_context(|| format!("Failed to connect to queue at {}", settings.redis_url))?;

    let executor = TransferExecutor::new(Arc::new(JsonRpcConnector::new()), fee_policy);
    let worker = Arc::new(
        TransferWorker::new(Arc::new(queue), executor).with_queue_name(&settings.queue_name),
    );

    let runner = worker.clone();
    let mut task = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut task => {
            result.context("Worker task panicked")??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    worker.stop();
    task.await.context("Worker task panicked")??;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!("Failed to listen for Ctrl-C: {}", e);
                        }
                    }
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("SIGTERM handler unavailable: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }
}
