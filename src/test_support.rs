//! Test doubles shared by unit and integration tests
//!
//! - `MockLedger` - scripted `LedgerClient` that records every call
//! - `sample_job` - a well-formed transfer job
//! - `capture_logs` - route `tracing` output into a buffer

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::ledger::{
    LedgerClient, LedgerConnector, SignedTransaction, TransactionReceipt, TransferRequest,
};
use crate::transfer::{TransferJob, DEMO_TRANSFER_AMOUNT};

pub const TEST_TOKEN_ADDRESS: &str = "0x77f565d1f11ad8ecff3e55cf1cde77bb6b189e44";
pub const TEST_SOURCE_ADDRESS: &str = "0x5d1d0b1d5790b1c88cc1e94366d3b242991dc05d";
pub const TEST_TARGET_ADDRESS: &str = "0xabAB8096c7C9922F991772164311Ba862bCE7622";
pub const TEST_PRIVATE_KEY: &str =
    "d15c43126f6966491820b8dc093a3ebed8ff48fa980ce52105f34d2296b228dc";
pub const TEST_LEDGER_ENDPOINT: &str = "http://127.0.0.1:8545";

/// A valid job moving the demo amount between the test wallets
pub fn sample_job() -> TransferJob {
    TransferJob {
        token_address: TEST_TOKEN_ADDRESS.into(),
        source_address: TEST_SOURCE_ADDRESS.into(),
        target_address: TEST_TARGET_ADDRESS.into(),
        private_key: TEST_PRIVATE_KEY.into(),
        amount: DEMO_TRANSFER_AMOUNT,
        ledger_endpoint: TEST_LEDGER_ENDPOINT.into(),
    }
}

/// Ledger operations recorded by `MockLedger`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerCall {
    BalanceOf,
    NextNonce,
    GasPrice,
    ChainId,
    BuildAndSign,
    Submit,
    AwaitReceipt,
}

#[derive(Default)]
struct MockLog {
    calls: Vec<LedgerCall>,
    requests: Vec<TransferRequest>,
    endpoints: Vec<String>,
}

/// Scripted ledger client
///
/// Defaults: balance 1000, nonce 1, gas price 20 gwei, chain id 1, receipt
/// `{status: 1, gas_used: 100000}`. Clones share the same call log.
#[derive(Clone)]
pub struct MockLedger {
    balance: u128,
    nonce: u64,
    gas_price: u128,
    chain_id: u64,
    receipt_status: u64,
    gas_used: u64,
    fail_balance: bool,
    fail_submit: bool,
    log: Arc<Mutex<MockLog>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            balance: 1000,
            nonce: 1,
            gas_price: 20_000_000_000,
            chain_id: 1,
            receipt_status: 1,
            gas_used: 100_000,
            fail_balance: false,
            fail_submit: false,
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn with_balance(mut self, balance: u128) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_receipt_status(mut self, status: u64) -> Self {
        self.receipt_status = status;
        self
    }

    /// Make `balance_of` fail like an unreachable node
    pub fn failing_balance(mut self) -> Self {
        self.fail_balance = true;
        self
    }

    /// Make `submit` fail like a rejected broadcast
    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// Connector handing out this mock for every endpoint
    pub fn connector(&self) -> Arc<dyn LedgerConnector> {
        Arc::new(self.clone())
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.log().calls.clone()
    }

    /// Calls that only happen once the balance check passed
    pub fn submission_calls(&self) -> Vec<LedgerCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    LedgerCall::BalanceOf | LedgerCall::GasPrice | LedgerCall::ChainId
                )
            })
            .collect()
    }

    /// Number of `submit` calls
    pub fn submit_count(&self) -> usize {
        self.count(LedgerCall::Submit)
    }

    /// Number of calls of one kind
    pub fn count(&self, kind: LedgerCall) -> usize {
        self.calls().iter().filter(|call| **call == kind).count()
    }

    /// Most recent signing request
    pub fn last_request(&self) -> Option<TransferRequest> {
        self.log().requests.last().cloned()
    }

    /// Endpoints the connector was asked for
    pub fn endpoints(&self) -> Vec<String> {
        self.log().endpoints.clone()
    }

    fn log(&self) -> MutexGuard<'_, MockLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: LedgerCall) {
        self.log().calls.push(call);
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerConnector for MockLedger {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn LedgerClient>> {
        self.log().endpoints.push(endpoint.to_string());
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn balance_of(&self, _token: &str, _owner: &str) -> Result<u128> {
        self.record(LedgerCall::BalanceOf);
        if self.fail_balance {
            bail!("connection refused");
        }
        Ok(self.balance)
    }

    async fn next_nonce(&self, _address: &str) -> Result<u64> {
        self.record(LedgerCall::NextNonce);
        Ok(self.nonce)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.record(LedgerCall::GasPrice);
        Ok(self.gas_price)
    }

    async fn chain_id(&self) -> Result<u64> {
        self.record(LedgerCall::ChainId);
        Ok(self.chain_id)
    }

    async fn build_and_sign_transfer(&self, request: &TransferRequest) -> Result<SignedTransaction> {
        let mut log = self.log();
        log.calls.push(LedgerCall::BuildAndSign);
        log.requests.push(request.clone());
        let sequence = log.requests.len();
        Ok(SignedTransaction {
            raw: vec![0xf8, sequence as u8],
            hash: format!("0x{:064x}", sequence),
        })
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<String> {
        self.record(LedgerCall::Submit);
        if self.fail_submit {
            bail!("nonce too low");
        }
        Ok(transaction.hash.clone())
    }

    async fn await_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        self.record(LedgerCall::AwaitReceipt);
        Ok(TransactionReceipt {
            tx_hash: tx_hash.to_string(),
            status: self.receipt_status,
            gas_used: self.gas_used,
        })
    }
}

/// Shared in-memory sink for captured log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture `tracing` output on the current thread until the guard drops
///
/// Use with the default single-threaded `#[tokio::test]` runtime so spawned
/// tasks log on the same thread.
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
