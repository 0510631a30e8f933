// ABOUTME: Error types for task tree execution
// ABOUTME: Distinguishes fatal errors from failures an error-containment block may absorb

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Unknown task type: {task_type}")]
    UnknownTaskType { task_id: String, task_type: String },

    #[error("FOREACH items must be an array, got {found}")]
    InvalidIterable { task_id: String, found: String },

    #[error("Invalid configuration for task {task_id}: {reason}")]
    InvalidConfiguration { task_id: String, reason: String },

    #[error("{message}")]
    ActionFailed {
        task_id: String,
        task_type: String,
        message: String,
    },

    #[error("Maximum nesting depth of {max_depth} exceeded at task {task_id}")]
    MaxDepthExceeded { task_id: String, max_depth: usize },

    #[error("Task flow cancelled before task {task_id}")]
    Cancelled { task_id: String },
}

impl ExecutionError {
    /// Fatal errors abort the whole flow and are never absorbed by `try`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecutionError::UnknownTaskType { .. }
                | ExecutionError::MaxDepthExceeded { .. }
                | ExecutionError::Cancelled { .. }
        )
    }

    /// Id of the task where the failure originated
    pub fn task_id(&self) -> &str {
        match self {
            ExecutionError::UnknownTaskType { task_id, .. }
            | ExecutionError::InvalidIterable { task_id, .. }
            | ExecutionError::InvalidConfiguration { task_id, .. }
            | ExecutionError::ActionFailed { task_id, .. }
            | ExecutionError::MaxDepthExceeded { task_id, .. }
            | ExecutionError::Cancelled { task_id } => task_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
