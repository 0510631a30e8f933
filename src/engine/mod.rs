// ABOUTME: Task tree execution engine for the tasktree interpreter
// ABOUTME: Walks task trees, runs control-flow handlers, and owns the flow variable store

mod control;
pub mod error;
pub mod executor;
pub mod progress;
pub mod scope;
pub mod variables;

pub use control::{ForeachConfig, IfConfig, WhileConfig};
pub use error::{ExecutionError, Result};
pub use executor::{TaskFlowEngine, DEFAULT_MAX_DEPTH};
pub use progress::{
    ProgressEvent, ProgressLog, ProgressReporter, ProgressStatus, ProgressSummary,
    TracingReporter,
};
pub use scope::{LayeredScope, Scope};
pub use variables::{VariableStore, COUNTER_VAR, ERROR_VAR, INDEX_VAR, ITERATION_VAR};
