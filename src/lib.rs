// ABOUTME: Main library module for the tasktree task flow interpreter
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod condition;
pub mod engine;
pub mod parser;
pub mod tasks;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use condition::{Condition, VariableLookup};
pub use engine::{
    ExecutionError, ProgressEvent, ProgressLog, ProgressReporter, ProgressStatus, TaskFlowEngine,
};
pub use parser::{FlowParser, FlowValidator, Task, TaskFlow, TaskType};
pub use tasks::{ActionRegistry, LatencyProfile, LeafAction};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
