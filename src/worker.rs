//! TransferWorker - consumes transfer jobs from the durable queue
//!
//! One worker polls one queue and executes jobs strictly one at a time:
//!
//! ```text
//! Starting -> Running -> Stopping -> Stopped
//! ```
//!
//! `stop()` never interrupts a job: the loop notices cancellation once the
//! current pop (bounded by the poll timeout) and its job have finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, AgentResult, WorkerState};
use crate::queue::{JobQueue, DEFAULT_TRANSFER_QUEUE};
use crate::transfer::{short_address, TransferExecutor, TransferJob, TransferOutcome};

/// How long a single pop waits for a job
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a failed pop before polling again
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of processing one popped payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job reached the ledger (or was skipped for balance)
    Completed(TransferOutcome),

    /// Payload could not be decoded or failed validation; dropped
    Malformed(String),

    /// A ledger call failed; dropped
    Failed(String),
}

/// Polls a queue and executes transfer jobs
pub struct TransferWorker {
    queue: Arc<dyn JobQueue>,
    executor: TransferExecutor,
    queue_name: String,
    poll_timeout: Duration,
    error_backoff: Duration,
    cancel: CancellationToken,
    stop_requested: AtomicBool,
    state: RwLock<WorkerState>,
}

impl TransferWorker {
    /// Create a worker for the default transfer queue
    pub fn new(queue: Arc<dyn JobQueue>, executor: TransferExecutor) -> Self {
        Self {
            queue,
            executor,
            queue_name: DEFAULT_TRANSFER_QUEUE.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            cancel: CancellationToken::new(),
            stop_requested: AtomicBool::new(false),
            state: RwLock::new(WorkerState::Starting),
        }
    }

    /// Poll a different queue
    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    /// Set how long each pop waits
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the pause after a failed pop
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Queue this worker polls
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Current lifecycle state
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Request shutdown
    ///
    /// Returns `true` for the call that actually requested it; later calls
    /// are no-ops and return `false`.
    pub fn stop(&self) -> bool {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::info!("[TransferWorker] Stop requested");
        self.cancel.cancel();
        true
    }

    /// Run the poll loop until `stop()` is called
    ///
    /// Closes the queue before returning. A worker runs at most once.
    pub async fn run(&self) -> AgentResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != WorkerState::Starting {
                return Err(AgentError::AgentAlreadyRunning(format!(
                    "transfer worker is {}",
                    *state
                )));
            }
            *state = WorkerState::Running;
        }
        tracing::info!("[TransferWorker] Listening on queue '{}'", self.queue_name);

        while !self.cancel.is_cancelled() {
            match self
                .queue
                .pop_with_timeout(&self.queue_name, self.poll_timeout)
                .await
            {
                Ok(Some(payload)) => {
                    self.process_payload(&payload).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        "[TransferWorker] Failed to pop from '{}': {:#}",
                        self.queue_name,
                        e
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        self.set_state(WorkerState::Stopping).await;
        if let Err(e) = self.queue.close().await {
            tracing::warn!("[TransferWorker] Failed to close queue connection: {:#}", e);
        }
        self.set_state(WorkerState::Stopped).await;
        tracing::info!("[TransferWorker] Stopped");
        Ok(())
    }

    /// Decode and execute a single payload
    ///
    /// Never fails: every problem is logged and reported in the outcome.
    /// Processing the same payload twice submits twice.
    pub async fn process_payload(&self, payload: &str) -> JobOutcome {
        let job = match TransferJob::from_json(payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("[TransferWorker] Dropping malformed job: {}", e);
                return JobOutcome::Malformed(e.to_string());
            }
        };

        tracing::debug!(job = ?job, "[TransferWorker] Processing job");

        match self.executor.execute(&job).await {
            Ok(outcome) => JobOutcome::Completed(outcome),
            Err(e) => {
                tracing::error!(
                    amount = %job.amount,
                    "[TransferWorker] Failed to transfer token from {} to {}: {:#}",
                    short_address(&job.source_address),
                    short_address(&job.target_address),
                    e
                );
                JobOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
        tracing::debug!("[TransferWorker] State -> {}", state);
    }
}

impl std::fmt::Debug for TransferWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferWorker")
            .field("queue_name", &self.queue_name)
            .field("poll_timeout", &self.poll_timeout)
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueue;
    use crate::test_support::{capture_logs, sample_job, LedgerCall, MockLedger};
    use crate::transfer::FeePolicy;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn worker(queue: Arc<dyn JobQueue>, ledger: &MockLedger) -> TransferWorker {
        TransferWorker::new(
            queue,
            TransferExecutor::new(ledger.connector(), FeePolicy::default()),
        )
        .with_poll_timeout(Duration::from_millis(20))
        .with_error_backoff(Duration::from_millis(10))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// Fails the first `failures` pops, then delegates
    struct FlakyQueue {
        inner: InMemoryQueue,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl JobQueue for FlakyQueue {
        async fn push(&self, queue: &str, payload: &str) -> Result<()> {
            self.inner.push(queue, payload).await
        }

        async fn pop_with_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("connection reset by peer");
            }
            self.inner.pop_with_timeout(queue, timeout).await
        }

        async fn close(&self) -> Result<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_stop_closes_queue_and_halts_polling() {
        let queue = Arc::new(InMemoryQueue::new());
        let ledger = MockLedger::new();
        let worker = Arc::new(worker(queue.clone(), &ledger));
        assert_eq!(worker.state().await, WorkerState::Starting);

        let runner = worker.clone();
        let task = tokio::spawn(async move { runner.run().await });

        wait_until(|| queue.pop_count() >= 2).await;
        assert_eq!(worker.state().await, WorkerState::Running);

        assert!(worker.stop());
        task.await.unwrap().unwrap();

        assert_eq!(worker.state().await, WorkerState::Stopped);
        assert!(queue.is_closed());

        let pops = queue.pop_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.pop_count(), pops);
    }

    #[tokio::test]
    async fn test_double_stop_is_noop() {
        let queue = Arc::new(InMemoryQueue::new());
        let worker = worker(queue.clone(), &MockLedger::new());

        assert!(worker.stop());
        assert!(!worker.stop());

        worker.run().await.unwrap();
        assert_eq!(queue.pop_count(), 0);
        assert_eq!(worker.state().await, WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        let worker = worker(Arc::new(InMemoryQueue::new()), &MockLedger::new());
        worker.stop();
        worker.run().await.unwrap();

        assert!(matches!(
            worker.run().await,
            Err(AgentError::AgentAlreadyRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let ledger = MockLedger::new();
        let worker = worker(Arc::new(InMemoryQueue::new()), &ledger);

        for payload in ["not json", "{}", r#"{"amount": 1}"#] {
            let outcome = worker.process_payload(payload).await;
            assert!(matches!(outcome, JobOutcome::Malformed(_)), "{}", payload);
        }
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_payload_submits_twice() {
        let ledger = MockLedger::new();
        let worker = worker(Arc::new(InMemoryQueue::new()), &ledger);
        let payload = sample_job().to_json().unwrap();

        worker.process_payload(&payload).await;
        worker.process_payload(&payload).await;

        assert_eq!(ledger.submit_count(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_transfer_with_fee_multiplier() {
        let (_guard, logs) = capture_logs();
        let ledger = MockLedger::new()
            .with_balance(1000)
            .with_gas_price(20_000_000_000)
            .with_chain_id(1);
        let worker = worker(Arc::new(InMemoryQueue::new()), &ledger);

        let outcome = worker
            .process_payload(&sample_job().to_json().unwrap())
            .await;

        let JobOutcome::Completed(TransferOutcome::Confirmed { gas_used, .. }) = outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        assert_eq!(gas_used, 100_000);

        let request = ledger.last_request().unwrap();
        assert_eq!(request.gas_price, 22_000_000_000);
        assert_eq!(request.gas_limit, 1_000_000);
        assert_eq!(request.chain_id, 1);
        assert_eq!(request.amount, 1);

        let output = logs.contents();
        assert!(output.contains("Transaction confirmed"), "{}", output);
        assert!(output.contains("gas_used=100000"), "{}", output);
    }

    #[tokio::test]
    async fn test_ledger_failure_reports_failed() {
        let ledger = MockLedger::new().failing_submit();
        let worker = worker(Arc::new(InMemoryQueue::new()), &ledger);

        let outcome = worker
            .process_payload(&sample_job().to_json().unwrap())
            .await;

        assert!(matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("nonce too low")));
        assert_eq!(ledger.count(LedgerCall::AwaitReceipt), 0);
    }

    #[tokio::test]
    async fn test_loop_survives_failures() {
        let queue = Arc::new(FlakyQueue {
            inner: InMemoryQueue::new(),
            failures: AtomicUsize::new(2),
        });
        let ledger = MockLedger::new().failing_submit();
        let worker = Arc::new(worker(queue.clone(), &ledger));

        let payload = sample_job().to_json().unwrap();
        queue.push(DEFAULT_TRANSFER_QUEUE, "garbage").await.unwrap();
        queue.push(DEFAULT_TRANSFER_QUEUE, &payload).await.unwrap();
        queue.push(DEFAULT_TRANSFER_QUEUE, &payload).await.unwrap();

        let runner = worker.clone();
        let task = tokio::spawn(async move { runner.run().await });

        wait_until(|| ledger.submit_count() == 2).await;
        worker.stop();
        task.await.unwrap().unwrap();

        assert_eq!(queue.inner.len(DEFAULT_TRANSFER_QUEUE).await, 0);
        assert_eq!(worker.state().await, WorkerState::Stopped);
    }
}
