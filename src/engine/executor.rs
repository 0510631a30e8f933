// ABOUTME: Recursive task tree executor and the engine facade owning the variable store
// ABOUTME: Dispatches each node in document order and decorates it with progress events

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::error::{ExecutionError, Result};
use super::progress::{ProgressEvent, ProgressReporter, ProgressStatus};
use super::scope::Scope;
use super::variables::VariableStore;
use crate::parser::{Task, TaskFlow, TaskType};
use crate::tasks::{ActionRegistry, OUTPUT_VARIABLE_KEY};

/// Nesting depth allowed unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Runs task trees. Each engine owns its own variable store, so independent
/// engines can execute flows concurrently without sharing state.
pub struct TaskFlowEngine {
    registry: ActionRegistry,
    variables: VariableStore,
    max_depth: usize,
    cancel: CancellationToken,
}

impl TaskFlowEngine {
    pub fn new() -> Self {
        Self::with_registry(ActionRegistry::new())
    }

    pub fn with_registry(registry: ActionRegistry) -> Self {
        Self {
            registry,
            variables: VariableStore::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token checked before every task; cancelling it stops the flow.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    /// Execute a root task sequence.
    ///
    /// The variable store is reset before the first task. Resolves once every
    /// task has run, or fails with the first failure no `try` block absorbed;
    /// events reported before the failure stay delivered.
    pub async fn execute_task_flow(
        &mut self,
        tasks: &[Task],
        reporter: &mut dyn ProgressReporter,
    ) -> Result<()> {
        self.run_root(tasks, IndexMap::new(), reporter).await
    }

    /// Execute a flow document, seeding its variables after the reset.
    pub async fn execute_flow(
        &mut self,
        flow: &TaskFlow,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<()> {
        info!("Starting task flow: {}", flow.name);
        self.run_root(&flow.tasks, flow.variables.clone(), reporter)
            .await
    }

    #[instrument(skip_all, fields(run_id = %uuid::Uuid::new_v4(), tasks = tasks.len()))]
    async fn run_root(
        &mut self,
        tasks: &[Task],
        seed: IndexMap<String, Value>,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<()> {
        self.variables.reset();
        self.variables.extend(seed);

        let mut runner = FlowRunner {
            registry: &self.registry,
            variables: &mut self.variables,
            reporter,
            max_depth: self.max_depth,
            cancel: &self.cancel,
        };

        let root = Scope::new();
        match runner.run_sequence(tasks, &root, 0).await {
            Ok(()) => {
                info!("Task flow completed");
                Ok(())
            }
            Err(e) => {
                error!("Task flow failed at task {}: {}", e.task_id(), e);
                Err(e)
            }
        }
    }

    /// Snapshot copy of the variable store
    pub fn variables(&self) -> IndexMap<String, Value> {
        self.variables.snapshot()
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Write directly into the live variable store
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.set(key, value);
    }
}

impl Default for TaskFlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskFlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFlowEngine")
            .field("variables", &self.variables.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// State for one top-level execution, threaded through the recursion.
pub(super) struct FlowRunner<'a> {
    pub(super) registry: &'a ActionRegistry,
    pub(super) variables: &'a mut VariableStore,
    pub(super) reporter: &'a mut dyn ProgressReporter,
    pub(super) max_depth: usize,
    pub(super) cancel: &'a CancellationToken,
}

impl<'a> FlowRunner<'a> {
    /// Run `tasks` in order, stopping at the first failure.
    pub(super) fn run_sequence<'s>(
        &'s mut self,
        tasks: &'s [Task],
        scope: &'s Scope,
        depth: usize,
    ) -> BoxFuture<'s, Result<()>> {
        async move {
            for task in tasks {
                self.run_task(task, scope, depth).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn run_task(&mut self, task: &Task, scope: &Scope, depth: usize) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Task flow cancelled before task {}", task.id);
            return Err(ExecutionError::Cancelled {
                task_id: task.id.clone(),
            });
        }

        self.emit(
            &task.id,
            ProgressStatus::Start,
            format!("Starting: {}", task.display_name()),
        );

        match self.dispatch(task, scope, depth).await {
            Ok(()) => {
                self.emit(
                    &task.id,
                    ProgressStatus::Success,
                    format!("Completed: {}", task.display_name()),
                );
                Ok(())
            }
            Err(e) => {
                self.emit(&task.id, ProgressStatus::Error, format!("Error: {}", e));
                Err(e)
            }
        }
    }

    async fn dispatch(&mut self, task: &Task, scope: &Scope, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(ExecutionError::MaxDepthExceeded {
                task_id: task.id.clone(),
                max_depth: self.max_depth,
            });
        }

        debug!("Dispatching task {} (type: {})", task.id, task.task_type);

        match &task.task_type {
            TaskType::If => self.run_if(task, scope, depth).await,
            TaskType::While => self.run_while(task, scope, depth).await,
            TaskType::Foreach => self.run_foreach(task, scope, depth).await,
            TaskType::Try => self.run_try(task, scope, depth).await,
            TaskType::Unknown(tag) => Err(ExecutionError::UnknownTaskType {
                task_id: task.id.clone(),
                task_type: tag.clone(),
            }),
            _ => self.run_leaf(task).await,
        }
    }

    async fn run_leaf(&mut self, task: &Task) -> Result<()> {
        let action =
            self.registry
                .get(&task.task_type)
                .ok_or_else(|| ExecutionError::UnknownTaskType {
                    task_id: task.id.clone(),
                    task_type: task.task_type.to_string(),
                })?;

        let output = action
            .execute(&task.id, task.config_value())
            .await
            .map_err(|e| ExecutionError::ActionFailed {
                task_id: task.id.clone(),
                task_type: task.task_type.to_string(),
                message: e.to_string(),
            })?;

        if let Some(value) = output.value {
            match task.config_str(OUTPUT_VARIABLE_KEY) {
                Some(name) => {
                    debug!("Storing output of task {} in '{}'", task.id, name);
                    self.variables.set(name, value);
                }
                None => debug!("Task {} produced output but names no variable", task.id),
            }
        }

        Ok(())
    }

    fn emit(&mut self, task_id: &str, status: ProgressStatus, message: String) {
        self.reporter
            .report(ProgressEvent::new(task_id, status, message));
    }
}
