// ABOUTME: Error types for guard expression parsing and evaluation
// ABOUTME: Every variant is downgraded to a false result by the lenient evaluator

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Cannot read property '{property}' of {target}")]
    InvalidAccess {
        property: String,
        target: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,
}

impl From<pest::error::Error<super::parser::Rule>> for ConditionError {
    fn from(err: pest::error::Error<super::parser::Rule>) -> Self {
        ConditionError::Syntax(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConditionError>;
