// ABOUTME: Task flow document structure and loading functionality
// ABOUTME: Parses YAML or JSON documents into a root task sequence plus seed variables

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::fs;

use super::error::{ParserError, Result};
use super::task::Task;

const ANONYMOUS_FLOW: &str = "untitled";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFlow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seeded into the variable store after it is reset.
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    pub tasks: Vec<Task>,
}

/// A flow file is either a full document or just the root task sequence.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlowDocument {
    Flow(TaskFlow),
    Tasks(Vec<Task>),
}

impl From<FlowDocument> for TaskFlow {
    fn from(document: FlowDocument) -> Self {
        match document {
            FlowDocument::Flow(flow) => flow,
            FlowDocument::Tasks(tasks) => TaskFlow::new(ANONYMOUS_FLOW, tasks),
        }
    }
}

impl TaskFlow {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: IndexMap::new(),
            tasks,
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Parse a flow from a YAML string (JSON is accepted as well)
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: FlowDocument = serde_yaml::from_str(content)?;
        Self::finish(document.into())
    }

    /// Parse a flow from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let document: FlowDocument = serde_json::from_str(content)?;
        Self::finish(document.into())
    }

    fn finish(mut flow: TaskFlow) -> Result<Self> {
        if flow.name.trim().is_empty() {
            return Err(ParserError::MissingField("name".to_string()));
        }

        fill_names(&mut flow.tasks);
        Ok(flow)
    }

    /// Total number of task nodes across the whole tree
    pub fn node_count(&self) -> usize {
        self.tasks.iter().map(Task::node_count).sum()
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ParserError::YamlError)
    }
}

/// Give every unnamed task its id as a label, recursively.
fn fill_names(tasks: &mut [Task]) {
    for task in tasks {
        if task.name.trim().is_empty() {
            task.name = task.id.clone();
        }
        for nested in [
            &mut task.children,
            &mut task.else_children,
            &mut task.catch_children,
        ] {
            if let Some(children) = nested {
                fill_names(children);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowParser;

impl FlowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<TaskFlow> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(ParserError::IoError)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => TaskFlow::from_json(&content),
            _ => self.parse_string(&content),
        }
    }

    pub fn parse_string(&self, content: &str) -> Result<TaskFlow> {
        TaskFlow::from_yaml(content)
    }
}

impl Default for FlowParser {
    fn default() -> Self {
        Self::new()
    }
}
