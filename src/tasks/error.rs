// ABOUTME: Error types reported by leaf action implementations
// ABOUTME: Covers lazy config validation failures and failures of the action itself

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Invalid {task_type} configuration: {reason}")]
    InvalidConfig { task_type: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;
