//! Process configuration
//!
//! Both binaries read their settings from the environment through
//! `Settings::from_env()`. Everything has a default except the transfer
//! wallet fields, which are only required once a transfer handler is built.

use std::time::Duration;

use crate::core::{AgentError, AgentResult};
use crate::handlers::DEFAULT_TRANSFER_KEYWORD;
use crate::queue::DEFAULT_TRANSFER_QUEUE;
use crate::transfer::{FeePolicy, TransferJob, DEMO_TRANSFER_AMOUNT};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_LEDGER_ENDPOINT: &str = "http://127.0.0.1:8545";
pub const DEFAULT_FEE_MULTIPLIER: f64 = 1.1;
pub const DEFAULT_BEHAVIOR_INTERVAL: Duration = Duration::from_secs(10);

/// Runtime settings
///
/// ```ignore
/// let settings = Settings::from_env()?
///     .with_queue_name("payments")
///     .with_fee_multiplier(1.25);
/// ```
#[derive(Clone)]
pub struct Settings {
    /// Redis connection URL
    pub redis_url: String,

    /// Queue transfer jobs go through
    pub queue_name: String,

    /// ERC-20 token contract
    pub token_address: Option<String>,

    /// Wallet paying for transfers
    pub source_address: Option<String>,

    /// Wallet receiving transfers
    pub target_address: Option<String>,

    /// Hex private key of the source wallet
    pub private_key: Option<String>,

    /// JSON-RPC endpoint jobs are executed against
    pub ledger_endpoint: String,

    /// Multiplier applied to the suggested gas price
    pub fee_multiplier: f64,

    /// Word that marks a message as a transfer request
    pub keyword: String,

    /// How often the random text behavior speaks
    pub behavior_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            queue_name: DEFAULT_TRANSFER_QUEUE.to_string(),
            token_address: None,
            source_address: None,
            target_address: None,
            private_key: None,
            ledger_endpoint: DEFAULT_LEDGER_ENDPOINT.to_string(),
            fee_multiplier: DEFAULT_FEE_MULTIPLIER,
            keyword: DEFAULT_TRANSFER_KEYWORD.to_string(),
            behavior_interval: DEFAULT_BEHAVIOR_INTERVAL,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> AgentResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let fee_multiplier = match var("FEE_MULTIPLIER") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                AgentError::invalid_config(format!("FEE_MULTIPLIER is not a number: {}", raw))
            })?,
            None => defaults.fee_multiplier,
        };

        let behavior_interval = match var("BEHAVIOR_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                AgentError::invalid_config(format!(
                    "BEHAVIOR_INTERVAL_SECS is not a whole number of seconds: {}",
                    raw
                ))
            })?),
            None => defaults.behavior_interval,
        };

        Ok(Self {
            redis_url: var("REDIS_URL").unwrap_or(defaults.redis_url),
            queue_name: var("TRANSFER_QUEUE").unwrap_or(defaults.queue_name),
            token_address: var("TOKEN_ADDRESS"),
            source_address: var("SOURCE_ADDRESS"),
            target_address: var("TARGET_ADDRESS"),
            private_key: var("PRIVATE_KEY"),
            ledger_endpoint: var("LEDGER_ENDPOINT")
                .or_else(|| var("WEB3_PROVIDER_URL"))
                .unwrap_or(defaults.ledger_endpoint),
            fee_multiplier,
            keyword: var("TRANSFER_KEYWORD")
                .map(|keyword| keyword.to_lowercase())
                .unwrap_or(defaults.keyword),
            behavior_interval,
        })
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Set the token, source and target of transfers
    pub fn with_wallets(
        mut self,
        token: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.token_address = Some(token.into());
        self.source_address = Some(source.into());
        self.target_address = Some(target.into());
        self
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn with_ledger_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ledger_endpoint = endpoint.into();
        self
    }

    pub fn with_fee_multiplier(mut self, multiplier: f64) -> Self {
        self.fee_multiplier = multiplier;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into().to_lowercase();
        self
    }

    pub fn with_behavior_interval(mut self, interval: Duration) -> Self {
        self.behavior_interval = interval;
        self
    }

    /// Template job for the transfer handlers
    ///
    /// Fails with `InvalidConfig` when a wallet field is missing and with
    /// `InvalidJob` when the resulting job does not validate.
    pub fn transfer_job(&self) -> AgentResult<TransferJob> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| AgentError::invalid_config(format!("{} is not set", name)))
        };

        let job = TransferJob {
            token_address: required(&self.token_address, "TOKEN_ADDRESS")?,
            source_address: required(&self.source_address, "SOURCE_ADDRESS")?,
            target_address: required(&self.target_address, "TARGET_ADDRESS")?,
            private_key: required(&self.private_key, "PRIVATE_KEY")?,
            amount: DEMO_TRANSFER_AMOUNT,
            ledger_endpoint: self.ledger_endpoint.clone(),
        };
        job.validate()?;
        Ok(job)
    }

    /// Gas pricing for the worker and the inline handler
    pub fn fee_policy(&self) -> AgentResult<FeePolicy> {
        FeePolicy::from_multiplier(self.fee_multiplier)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("redis_url", &self.redis_url)
            .field("queue_name", &self.queue_name)
            .field("token_address", &self.token_address)
            .field("source_address", &self.source_address)
            .field("target_address", &self.target_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("ledger_endpoint", &self.ledger_endpoint)
            .field("fee_multiplier", &self.fee_multiplier)
            .field("keyword", &self.keyword)
            .field("behavior_interval", &self.behavior_interval)
            .finish()
    }
}
