//! EVM JSON-RPC ledger client

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::hex;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::signer::sign_erc20_transfer;
use crate::core::AgentError;
use super::{LedgerClient, LedgerConnector, SignedTransaction, TransactionReceipt, TransferRequest};

/// `balanceOf(address)` selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Default interval between receipt lookups
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for a receipt before giving up
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Ledger client speaking Ethereum JSON-RPC over HTTP
pub struct JsonRpcLedgerClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl JsonRpcLedgerClient {
    /// Create a client for `endpoint` sharing an HTTP client
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Set how often `await_receipt` polls
    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    /// Set how long `await_receipt` waits
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call_optional<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!("[JsonRpc] {} -> {}", method, self.endpoint);

        let response: RpcResponse<T> = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request to {} failed", method, self.endpoint))?
            .error_for_status()
            .with_context(|| format!("{} returned an HTTP error", method))?
            .json()
            .await
            .with_context(|| format!("{} returned a malformed response", method))?;

        if let Some(error) = response.error {
            bail!("{} failed: {} (code {})", method, error.message, error.code);
        }
        Ok(response.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| anyhow!("{} returned no result", method))
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn balance_of(&self, token: &str, owner: &str) -> Result<u128> {
        let owner_hex = owner.trim().trim_start_matches("0x");
        let data = format!("0x{}{:0>64}", BALANCE_OF_SELECTOR, owner_hex.to_lowercase());
        let word: String = self
            .call("eth_call", json!([{ "to": token, "data": data }, "latest"]))
            .await?;
        parse_quantity(&word, "balance")
    }

    async fn next_nonce(&self, address: &str) -> Result<u64> {
        let quantity: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_u64(&quantity, "nonce")
    }

    async fn gas_price(&self) -> Result<u128> {
        let quantity: String = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity(&quantity, "gas price")
    }

    async fn chain_id(&self) -> Result<u64> {
        let quantity: String = self.call("eth_chainId", json!([])).await?;
        parse_u64(&quantity, "chain id")
    }

    async fn build_and_sign_transfer(&self, request: &TransferRequest) -> Result<SignedTransaction> {
        sign_erc20_transfer(request)
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<String> {
        let raw = hex::encode_prefixed(&transaction.raw);
        self.call("eth_sendRawTransaction", json!([raw])).await
    }

    async fn await_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;

        loop {
            let receipt: Option<Value> = self
                .call_optional("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt {
                let field = |name: &str| -> Result<u64> {
                    let raw = receipt
                        .get(name)
                        .and_then(Value::as_str)
                        .ok_or_else(|| anyhow!("receipt for {} has no {}", tx_hash, name))?;
                    parse_u64(raw, name)
                };
                return Ok(TransactionReceipt {
                    tx_hash: tx_hash.to_string(),
                    status: field("status")?,
                    gas_used: field("gasUsed")?,
                });
            }

            if tokio::time::Instant::now() >= deadline {
                bail!(
                    "no receipt for {} after {}s",
                    tx_hash,
                    self.receipt_timeout.as_secs()
                );
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

impl std::fmt::Debug for JsonRpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcLedgerClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Builds `JsonRpcLedgerClient`s over one shared HTTP connection pool
#[derive(Debug, Clone, Default)]
pub struct JsonRpcConnector {
    http: reqwest::Client,
}

impl JsonRpcConnector {
    /// Create a connector with its own HTTP client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector around an existing HTTP client
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl LedgerConnector for JsonRpcConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn LedgerClient>> {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AgentError::Ledger(format!(
                "ledger endpoint must be an http(s) URL, got {}",
                endpoint
            ))
            .into());
        }
        Ok(Arc::new(JsonRpcLedgerClient::new(self.http.clone(), endpoint)))
    }
}

/// Parse a hex quantity or 32-byte word into u128
///
/// Values wider than 128 bits saturate.
fn parse_quantity(raw: &str, field: &str) -> Result<u128> {
    let digits = raw
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("{} is not 0x-prefixed: {}", field, raw))?
        .trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("{} is not hex: {}", field, raw);
    }
    if digits.len() > 32 {
        tracing::warn!("[JsonRpc] {} {} exceeds 128 bits, saturating", field, raw);
        return Ok(u128::MAX);
    }
    u128::from_str_radix(digits, 16).with_context(|| format!("invalid {}: {}", field, raw))
}

fn parse_u64(raw: &str, field: &str) -> Result<u64> {
    let value = parse_quantity(raw, field)?;
    u64::try_from(value).map_err(|_| anyhow!("{} does not fit in 64 bits: {}", field, raw))
}
