// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides task builders, scripted leaf actions, and temp-dir flow files

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use tasktree::engine::{ProgressLog, ProgressStatus, TaskFlowEngine};
use tasktree::parser::{Task, TaskFlow, TaskType};
use tasktree::tasks::{ActionError, ActionOutput, ActionRegistry, LatencyProfile, LeafAction};

pub const FAILURE_MESSAGE: &str = "element not found";

/// Engine with every stub action and no simulated latency
pub fn instant_engine() -> TaskFlowEngine {
    TaskFlowEngine::with_registry(ActionRegistry::simulated(LatencyProfile::instant()))
}

/// Engine where `click_element` always fails with [`FAILURE_MESSAGE`]
pub fn failing_click_engine() -> TaskFlowEngine {
    let mut engine = instant_engine();
    engine.registry_mut().register(Box::new(FailingAction {
        task_type: TaskType::ClickElement,
        message: FAILURE_MESSAGE.to_string(),
    }));
    engine
}

pub fn screenshot(id: &str) -> Task {
    Task::new(id, "screenshot").with_config("filename", format!("{}.png", id))
}

pub fn click(id: &str) -> Task {
    Task::new(id, "click_element").with_config("selector", "#button")
}

pub fn if_task(id: &str, condition: &str, then: Vec<Task>, otherwise: Vec<Task>) -> Task {
    Task::new(id, "if")
        .with_config("condition", condition)
        .with_children(then)
        .with_else_children(otherwise)
}

pub fn while_task(id: &str, condition: &str, max_iterations: i64, body: Vec<Task>) -> Task {
    Task::new(id, "while")
        .with_config("condition", condition)
        .with_config("maxIterations", max_iterations)
        .with_children(body)
}

pub fn foreach_task(id: &str, items: impl Into<Value>, item_var: &str, body: Vec<Task>) -> Task {
    Task::new(id, "foreach")
        .with_config("items", items)
        .with_config("itemVar", item_var)
        .with_children(body)
}

pub fn try_task(id: &str, body: Vec<Task>, catch: Vec<Task>) -> Task {
    Task::new(id, "try")
        .with_children(body)
        .with_catch_children(catch)
}

pub fn start(id: &str) -> (String, ProgressStatus) {
    (id.to_string(), ProgressStatus::Start)
}

pub fn success(id: &str) -> (String, ProgressStatus) {
    (id.to_string(), ProgressStatus::Success)
}

pub fn error(id: &str) -> (String, ProgressStatus) {
    (id.to_string(), ProgressStatus::Error)
}

/// Ids of the tasks that completed successfully, in order
pub fn completed_ids(log: &ProgressLog) -> Vec<String> {
    log.events()
        .iter()
        .filter(|event| event.status == ProgressStatus::Success)
        .map(|event| event.task_id.clone())
        .collect()
}

/// Leaf action that always fails with a fixed message.
pub struct FailingAction {
    pub task_type: TaskType,
    pub message: String,
}

#[async_trait]
impl LeafAction for FailingAction {
    async fn execute(&self, _task_id: &str, _config: Value) -> Result<ActionOutput, ActionError> {
        Err(ActionError::Failed(self.message.clone()))
    }

    fn task_type(&self) -> TaskType {
        self.task_type.clone()
    }

    fn validate_config(&self, _config: &Value) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Leaf action that cancels the given token when it runs.
pub struct CancellingAction {
    pub token: CancellationToken,
}

#[async_trait]
impl LeafAction for CancellingAction {
    async fn execute(&self, _task_id: &str, _config: Value) -> Result<ActionOutput, ActionError> {
        self.token.cancel();
        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::Screenshot
    }

    fn validate_config(&self, _config: &Value) -> Result<(), ActionError> {
        Ok(())
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn flow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    pub async fn write_flow(&self, name: &str, flow: &TaskFlow) -> PathBuf {
        let yaml = flow.to_yaml().expect("Failed to serialize flow");
        self.write_raw(name, &yaml).await
    }

    pub async fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let flow_file = self.flow_file(name);
        fs::write(&flow_file, content)
            .await
            .expect("Failed to write flow file");
        flow_file
    }
}

pub async fn read_json_output(
    file_path: &Path,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(json)
}
