// ABOUTME: Parser module for task flow documents
// ABOUTME: Exports the task tree model, flow loading, and static validation

pub mod error;
pub mod flow;
pub mod task;
pub mod validation;

pub use error::{ParserError, ValidationError};
pub use flow::{FlowParser, TaskFlow};
pub use task::{Task, TaskType};
pub use validation::{FlowValidator, ValidationReport};
