//! TransferExecutor - runs one transfer job against the ledger
//!
//! Shared by the queue worker and the inline handler so both follow the
//! same balance check and the same fee policy.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::fee::FeePolicy;
use super::job::{short_address, TransferJob};
use crate::ledger::{LedgerConnector, TransferRequest};

/// What happened to a job that reached the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Mined with a success status
    Confirmed {
        /// Transaction hash
        tx_hash: String,
        /// Gas consumed
        gas_used: u64,
    },

    /// Mined but reverted
    Reverted {
        /// Transaction hash
        tx_hash: String,
        /// Gas consumed
        gas_used: u64,
    },

    /// Source balance below the job amount; nothing was submitted
    InsufficientBalance {
        /// Balance at lookup time
        balance: u128,
        /// Amount the job asked for
        amount: u128,
    },
}

/// Executes transfer jobs
#[derive(Clone)]
pub struct TransferExecutor {
    connector: Arc<dyn LedgerConnector>,
    fee_policy: FeePolicy,
}

impl TransferExecutor {
    /// Create an executor
    pub fn new(connector: Arc<dyn LedgerConnector>, fee_policy: FeePolicy) -> Self {
        Self {
            connector,
            fee_policy,
        }
    }

    /// Fee policy in use
    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    /// Run one job to completion
    ///
    /// Checks the balance first and only touches the nonce, signer and
    /// network when it covers the amount. Blocks until the receipt arrives.
    pub async fn execute(&self, job: &TransferJob) -> Result<TransferOutcome> {
        let ledger = self.connector.connect(&job.ledger_endpoint)?;

        let balance = ledger
            .balance_of(&job.token_address, &job.source_address)
            .await
            .context("balance lookup failed")?;
        tracing::info!(
            balance = %balance,
            "[TransferExecutor] Balance of {} before transfer",
            short_address(&job.source_address)
        );

        if balance < job.amount {
            tracing::warn!(
                balance = %balance,
                amount = %job.amount,
                "[TransferExecutor] Insufficient balance in {}, skipping transfer",
                short_address(&job.source_address)
            );
            return Ok(TransferOutcome::InsufficientBalance {
                balance,
                amount: job.amount,
            });
        }

        let nonce = ledger
            .next_nonce(&job.source_address)
            .await
            .context("nonce lookup failed")?;
        let suggested_price = ledger.gas_price().await.context("gas price lookup failed")?;
        let chain_id = ledger.chain_id().await.context("chain id lookup failed")?;

        let request = TransferRequest {
            token: job.token_address.clone(),
            from: job.source_address.clone(),
            to: job.target_address.clone(),
            amount: job.amount,
            nonce,
            gas_price: self.fee_policy.apply(suggested_price),
            gas_limit: self.fee_policy.gas_limit(),
            chain_id,
            private_key: job.private_key.clone(),
        };

        let signed = ledger
            .build_and_sign_transfer(&request)
            .await
            .context("signing failed")?;
        let tx_hash = ledger.submit(&signed).await.context("submission failed")?;

        tracing::info!(
            tx_hash = %tx_hash,
            amount = %job.amount,
            gas_price = %request.gas_price,
            "[TransferExecutor] Transfer submitted: {} -> {}",
            short_address(&job.source_address),
            short_address(&job.target_address)
        );

        let receipt = ledger
            .await_receipt(&tx_hash)
            .await
            .with_context(|| format!("waiting for receipt of {} failed", tx_hash))?;

        if receipt.succeeded() {
            tracing::info!(
                tx_hash = %tx_hash,
                gas_used = receipt.gas_used,
                "[TransferExecutor] Transaction confirmed"
            );
            Ok(TransferOutcome::Confirmed {
                tx_hash,
                gas_used: receipt.gas_used,
            })
        } else {
            tracing::error!(
                tx_hash = %tx_hash,
                status = receipt.status,
                "[TransferExecutor] Transaction failed on chain"
            );
            Ok(TransferOutcome::Reverted {
                tx_hash,
                gas_used: receipt.gas_used,
            })
        }
    }
}

impl std::fmt::Debug for TransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferExecutor")
            .field("fee_policy", &self.fee_policy)
            .finish()
    }
}
