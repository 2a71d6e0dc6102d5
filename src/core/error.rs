//! Runtime error types

use thiserror::Error;

/// Errors that can occur in the agent runtime
#[derive(Error, Debug)]
pub enum AgentError {
    /// Agent is already running
    #[error("Agent already running: {0}")]
    AgentAlreadyRunning(String),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    ChannelClosed,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Queue service error
    #[error("Queue error: {0}")]
    Queue(String),

    /// Ledger client error
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Transfer job failed validation
    #[error("Invalid transfer job: {0}")]
    InvalidJob(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        AgentError::Other(msg.into())
    }

    /// Create an invalid job error
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        AgentError::InvalidJob(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        AgentError::InvalidConfig(msg.into())
    }
}

impl From<redis::RedisError> for AgentError {
    fn from(err: redis::RedisError) -> Self {
        AgentError::Queue(err.to_string())
    }
}

/// Result type alias for runtime operations
pub type AgentResult<T> = Result<T, AgentError>;
