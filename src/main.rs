//! Two agents talking to each other
//!
//! Each agent's outbox is relayed into the other's inbox. Both greet each
//! other and queue a token transfer whenever a message mentions the
//! transfer keyword; the `transfer-worker` binary executes those jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use tokio::task::JoinHandle;

use autonomous_agents::behaviors::RandomTextBehavior;
use autonomous_agents::config::Settings;
use autonomous_agents::handlers::{GreetingHandler, TransferQueueHandler};
use autonomous_agents::logging;
use autonomous_agents::queue::{JobQueue, RedisQueue};
use autonomous_agents::runtime::{Agent, AgentContext, OutboxReceiver};
use autonomous_agents::transfer::TransferJob;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging()?;

    let settings = Settings::from_env()?;
    tracing::info!(settings = ?settings, "=== Autonomous Agents Starting ===");

    let job = settings
        .transfer_job()
        .context("Transfer settings are incomplete")?;

    let queue: Arc<dyn JobQueue> = Arc::new(
        RedisQueue::connect(&settings.redis_url)
            .await
            .with_context(|| format!("Failed to connect to queue at {}", settings.redis_url))?,
    );

    let mut alice = build_agent("alice", &settings, queue.clone(), job.clone())?;
    let mut bob = build_agent("bob", &settings, queue.clone(), job)?;

    let relays = [
        relay(
            alice.take_outbox().context("alice outbox already taken")?,
            alice.name().to_string(),
            bob.context(),
            Color::Cyan,
        ),
        relay(
            bob.take_outbox().context("bob outbox already taken")?,
            bob.name().to_string(),
            alice.context(),
            Color::Magenta,
        ),
    ];

    alice.start()?;
    bob.start()?;

    println!(
        "{} {}",
        "System:".yellow().bold(),
        "alice and bob are talking. Press Ctrl-C to stop."
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    println!("{} {}", "System:".yellow().bold(), "Shutting down...");
    alice.stop().await?;
    bob.stop().await?;

    for relay in relays {
        relay.abort();
    }
    queue.close().await?;

    tracing::info!("=== Autonomous Agents Stopped ===");
    Ok(())
}

fn build_agent(
    name: &str,
    settings: &Settings,
    queue: Arc<dyn JobQueue>,
    job: TransferJob,
) -> Result<Agent> {
    let transfer = TransferQueueHandler::new(queue, job)?
        .with_queue_name(&settings.queue_name)
        .with_keyword(&settings.keyword);

    let mut agent = Agent::new(name);
    agent.register_handler(GreetingHandler::new())?;
    agent.register_handler(transfer)?;
    agent.register_behavior(RandomTextBehavior::new(settings.behavior_interval))?;
    Ok(agent)
}

/// Print everything `from` says and deliver it to `to`
fn relay(
    mut outbox: OutboxReceiver,
    from: String,
    to: AgentContext,
    color: Color,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            println!(
                "{} {} {}",
                format!("{}:", from).color(color).bold(),
                format!("(to {})", to.name()).dimmed(),
                message
            );
            if let Err(e) = to.deliver(message) {
                tracing::warn!("[Relay] {} -> {} stopped: {}", from, to.name(), e);
                break;
            }
        }
    })
}
