// ABOUTME: Static validation of task trees without executing them
// ABOUTME: Reports unknown types, bad conditions and leaf config problems as errors or warnings

use serde::de::DeserializeOwned;
use std::collections::HashSet;

use super::error::ValidationError;
use super::flow::TaskFlow;
use super::task::{Task, TaskType};
use crate::condition::Condition;
use crate::engine::{ForeachConfig, IfConfig, WhileConfig};
use crate::tasks::ActionRegistry;

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

/// Checks a flow before it runs. The engine itself never calls this; a flow
/// that fails validation can still be executed and fails at the bad node.
pub struct FlowValidator {
    registry: ActionRegistry,
}

impl FlowValidator {
    pub fn new() -> Self {
        Self::with_registry(ActionRegistry::new())
    }

    pub fn with_registry(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    /// Validate a complete flow document
    pub fn validate(&self, flow: &TaskFlow) -> ValidationReport {
        let mut report = self.validate_tasks(&flow.tasks);
        if flow.tasks.is_empty() {
            report.errors.insert(0, ValidationError::EmptyFlow);
            report.is_valid = false;
        }
        report
    }

    /// Validate a bare task sequence
    pub fn validate_tasks(&self, tasks: &[Task]) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut seen_ids = HashSet::new();

        self.walk(tasks, &mut seen_ids, &mut report);

        report.is_valid = report.errors.is_empty();
        report
    }

    fn walk<'t>(
        &self,
        tasks: &'t [Task],
        seen_ids: &mut HashSet<&'t str>,
        report: &mut ValidationReport,
    ) {
        for task in tasks {
            if !seen_ids.insert(task.id.as_str()) {
                report
                    .warnings
                    .push(format!("Duplicate task id '{}'", task.id));
            }

            if let Err(error) = self.validate_single_task(task, report) {
                report.errors.push(error);
            }

            self.walk(task.children(), seen_ids, report);
            self.walk(task.else_children(), seen_ids, report);
            self.walk(task.catch_children(), seen_ids, report);
        }
    }

    fn validate_single_task(
        &self,
        task: &Task,
        report: &mut ValidationReport,
    ) -> Result<(), ValidationError> {
        self.check_branches(task, report);

        match &task.task_type {
            TaskType::Unknown(tag) => Err(ValidationError::UnknownTaskType {
                task: task.id.clone(),
                task_type: tag.clone(),
                supported_types: self.supported_types(),
            }),
            TaskType::If => {
                let config: IfConfig = typed_config(task)?;
                validate_condition(task, &config.condition, report)
            }
            TaskType::While => {
                let config: WhileConfig = typed_config(task)?;
                if config.max_iterations <= 0.0 {
                    report.warnings.push(format!(
                        "Task '{}': maxIterations is {}, the loop body never runs",
                        task.id, config.max_iterations
                    ));
                }
                validate_condition(task, &config.condition, report)
            }
            TaskType::Foreach => {
                let config: ForeachConfig = typed_config(task)?;
                if config.items.is_null() {
                    report.warnings.push(format!(
                        "Task '{}': no items given, the loop body never runs",
                        task.id
                    ));
                }
                if !task.config.contains_key("itemVar") && !task.config.contains_key("item_var") {
                    report.warnings.push(format!(
                        "Task '{}': no itemVar given, items are bound as 'item'",
                        task.id
                    ));
                }
                Ok(())
            }
            TaskType::Try => Ok(()),
            leaf => self
                .registry
                .validate_task_config(leaf, &task.config_value())
                .map_err(|e| ValidationError::InvalidTaskConfig {
                    task: task.id.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Child sequences a node type never runs are reported, not rejected.
    fn check_branches(&self, task: &Task, report: &mut ValidationReport) {
        let mut stray = Vec::new();

        if task.task_type.is_leaf() && task.children.is_some() {
            stray.push("children");
        }
        if task.task_type != TaskType::If && task.else_children.is_some() {
            stray.push("elseChildren");
        }
        if task.task_type != TaskType::Try && task.catch_children.is_some() {
            stray.push("catchChildren");
        }

        for field in stray {
            report.warnings.push(format!(
                "Task '{}' ({}) ignores its {}",
                task.id, task.task_type, field
            ));
        }
    }

    fn supported_types(&self) -> Vec<String> {
        let mut types = self.registry.supported_types();
        types.extend(
            [TaskType::If, TaskType::While, TaskType::Foreach, TaskType::Try]
                .iter()
                .map(|t| t.to_string()),
        );
        types
    }
}

fn typed_config<T: DeserializeOwned>(task: &Task) -> Result<T, ValidationError> {
    serde_json::from_value(task.config_value()).map_err(|e| ValidationError::InvalidTaskConfig {
        task: task.id.clone(),
        reason: e.to_string(),
    })
}

fn validate_condition(
    task: &Task,
    condition: &str,
    report: &mut ValidationReport,
) -> Result<(), ValidationError> {
    if condition.trim().is_empty() {
        report.warnings.push(format!(
            "Task '{}': no condition given, it always evaluates to false",
            task.id
        ));
        return Ok(());
    }

    Condition::parse(condition)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidCondition {
            task: task.id.clone(),
            error: e.to_string(),
        })
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for FlowValidator {
    fn default() -> Self {
        Self::new()
    }
}
