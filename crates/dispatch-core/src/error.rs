use crate::task::{TaskId, TaskStatus};
use thiserror::Error;

/// Top-level error type for Dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Durable storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Task status machine violated.
    #[error("task #{task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task #{0} not found")]
    TaskNotFound(TaskId),

    #[error("debt #{0} not found")]
    DebtNotFound(i64),

    /// Malformed wizard input. The message is shown to the actor as-is.
    #[error("{0}")]
    Validation(String),

    /// A wizard step is active but its session data is gone.
    #[error("session data missing for {0}")]
    CacheMiss(String),

    /// The actor lacks the role required for an operation.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    /// Whether the error is resolved inside the conversation (re-prompt,
    /// reject, reset) rather than failing the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::TaskNotFound(_)
                | Self::DebtNotFound(_)
                | Self::Validation(_)
                | Self::CacheMiss(_)
                | Self::NotPermitted(_)
        )
    }
}
