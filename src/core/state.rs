//! Lifecycle states for agents and workers

use serde::{Deserialize, Serialize};

/// Lifecycle of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentStatus {
    /// Agent is not dispatching messages
    #[default]
    Stopped,

    /// Dispatch loop and behaviors are running
    Running,
}

/// Lifecycle of the transfer worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkerState {
    /// Created, poll loop not entered yet
    #[default]
    Starting,

    /// Polling the queue
    Running,

    /// Stop requested, finishing the current poll and closing connections
    Stopping,

    /// Poll loop exited and the queue connection is closed
    Stopped,
}

impl WorkerState {
    /// Check if the worker has fully stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Stopped => write!(f, "Stopped"),
            AgentStatus::Running => write!(f, "Running"),
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Starting => write!(f, "Starting"),
            WorkerState::Running => write!(f, "Running"),
            WorkerState::Stopping => write!(f, "Stopping"),
            WorkerState::Stopped => write!(f, "Stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(AgentStatus::default(), AgentStatus::Stopped);
        assert_eq!(WorkerState::default(), WorkerState::Starting);
    }

    #[test]
    fn test_worker_state_checks() {
        assert!(WorkerState::Stopped.is_terminal());
        assert!(!WorkerState::Stopping.is_terminal());
        assert_eq!(WorkerState::Stopping.to_string(), "Stopping");
    }
}
