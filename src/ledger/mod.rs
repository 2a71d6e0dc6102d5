//! Ledger client capability
//!
//! The worker and the inline handler only talk to the chain through the
//! `LedgerClient` trait. This module provides:
//! - `LedgerClient` trait - balance / nonce / fee / sign / submit / receipt
//! - `LedgerConnector` trait - builds a client for a job's ledger endpoint
//! - `JsonRpcLedgerClient` - EVM JSON-RPC implementation for ERC-20 tokens
//! - `sign_erc20_transfer` - legacy EIP-155 transaction signing

mod rpc;
mod signer;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use rpc::{JsonRpcConnector, JsonRpcLedgerClient};
pub use signer::{address_from_private_key, sign_erc20_transfer, transfer_calldata};

/// Everything needed to build and sign one token transfer
#[derive(Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Token contract address
    pub token: String,
    /// Sending wallet
    pub from: String,
    /// Receiving wallet
    pub to: String,
    /// Amount in token base units
    pub amount: u128,
    /// Account nonce of `from`
    pub nonce: u64,
    /// Gas price after the fee policy was applied
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Chain ID for replay protection
    pub chain_id: u64,
    /// Hex private key of `from`
    pub private_key: String,
}

impl std::fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRequest")
            .field("token", &self.token)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("amount", &self.amount)
            .field("nonce", &self.nonce)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .field("chain_id", &self.chain_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// A signed, encoded transaction ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Raw RLP bytes
    pub raw: Vec<u8>,
    /// 0x-prefixed transaction hash
    pub hash: String,
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// 1 on success, 0 on revert
    pub status: u64,
    /// Gas consumed
    pub gas_used: u64,
}

impl TransactionReceipt {
    /// Whether the transaction executed successfully
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Trait for the chain client used to move tokens
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Token balance of `owner`, in base units
    async fn balance_of(&self, token: &str, owner: &str) -> Result<u128>;

    /// Next nonce to use for `address`
    async fn next_nonce(&self, address: &str) -> Result<u64>;

    /// Gas price suggested by the network
    async fn gas_price(&self) -> Result<u128>;

    /// Chain ID of the network
    async fn chain_id(&self) -> Result<u64>;

    /// Build an ERC-20 `transfer` transaction and sign it
    async fn build_and_sign_transfer(&self, request: &TransferRequest) -> Result<SignedTransaction>;

    /// Broadcast a signed transaction, returning its hash
    async fn submit(&self, transaction: &SignedTransaction) -> Result<String>;

    /// Wait until the transaction is mined
    async fn await_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt>;
}

/// Builds ledger clients for the endpoint carried by each job
pub trait LedgerConnector: Send + Sync {
    /// Get a client for `endpoint`
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn LedgerClient>>;
}
