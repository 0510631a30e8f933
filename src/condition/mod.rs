// ABOUTME: Guard expression module for conditional and looping task nodes
// ABOUTME: Restricted grammar parsed with PEST and evaluated by a read-only walker

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use error::{ConditionError, Result};
pub use evaluator::{evaluate, is_truthy, try_evaluate, Condition, VariableLookup};
