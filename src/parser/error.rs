// ABOUTME: Error types for task flow parsing and validation
// ABOUTME: Defines specific error types for parser module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read task flow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid task flow format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown task type '{task_type}' in task '{task}'. Supported types: {supported_types:?}")]
    UnknownTaskType {
        task: String,
        task_type: String,
        supported_types: Vec<String>,
    },

    #[error("Invalid task configuration for '{task}': {reason}")]
    InvalidTaskConfig { task: String, reason: String },

    #[error("Invalid condition in task '{task}': {error}")]
    InvalidCondition { task: String, error: String },

    #[error("Empty task flow: no tasks defined")]
    EmptyFlow,
}

pub type Result<T> = std::result::Result<T, ParserError>;
