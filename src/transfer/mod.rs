//! Token transfer jobs
//!
//! This module provides:
//! - `TransferJob` - The serialized unit of work carried by the queue
//! - `FeePolicy` - Gas price multiplier and gas limit
//! - `TransferExecutor` - Runs a job against a ledger client

mod executor;
mod fee;
mod job;

pub use executor::{TransferExecutor, TransferOutcome};
pub use fee::FeePolicy;
pub use job::{is_address, short_address, TransferJob, DEMO_TRANSFER_AMOUNT};
