// ABOUTME: Task tree node structures and task type definitions
// ABOUTME: Defines the Task node, its typed tag, and helpers for reading its config

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of a task tree: a leaf action or a control-flow construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Task>>,
    #[serde(
        default,
        alias = "else_children",
        skip_serializing_if = "Option::is_none"
    )]
    pub else_children: Option<Vec<Task>>,
    #[serde(
        default,
        alias = "catch_children",
        skip_serializing_if = "Option::is_none"
    )]
    pub catch_children: Option<Vec<Task>>,
}

/// Tag selecting a leaf action or a control-flow handler.
///
/// Unrecognized tags are kept as `Unknown` so that loading a flow never fails
/// on them; dispatch rejects them when the node is reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    OpenBrowser,
    ClickElement,
    InputText,
    Wait,
    GetText,
    Screenshot,
    If,
    While,
    Foreach,
    Try,
    Unknown(String),
}

impl TaskType {
    /// Every recognized leaf action type.
    pub const LEAF_TYPES: [TaskType; 6] = [
        TaskType::OpenBrowser,
        TaskType::ClickElement,
        TaskType::InputText,
        TaskType::Wait,
        TaskType::GetText,
        TaskType::Screenshot,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TaskType::OpenBrowser => "open_browser",
            TaskType::ClickElement => "click_element",
            TaskType::InputText => "input_text",
            TaskType::Wait => "wait",
            TaskType::GetText => "get_text",
            TaskType::Screenshot => "screenshot",
            TaskType::If => "if",
            TaskType::While => "while",
            TaskType::Foreach => "foreach",
            TaskType::Try => "try",
            TaskType::Unknown(tag) => tag,
        }
    }

    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            TaskType::If | TaskType::While | TaskType::Foreach | TaskType::Try
        )
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_control_flow() && !self.is_unknown()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TaskType::Unknown(_))
    }
}

impl From<String> for TaskType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "open_browser" => TaskType::OpenBrowser,
            "click_element" => TaskType::ClickElement,
            "input_text" => TaskType::InputText,
            "wait" => TaskType::Wait,
            "get_text" => TaskType::GetText,
            "screenshot" => TaskType::Screenshot,
            "if" => TaskType::If,
            "while" => TaskType::While,
            "foreach" => TaskType::Foreach,
            "try" => TaskType::Try,
            _ => TaskType::Unknown(tag),
        }
    }
}

impl From<&str> for TaskType {
    fn from(tag: &str) -> Self {
        TaskType::from(tag.to_string())
    }
}

impl From<TaskType> for String {
    fn from(task_type: TaskType) -> Self {
        task_type.as_str().to_string()
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Task {
    pub fn new(id: impl Into<String>, task_type: impl Into<TaskType>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            task_type: task_type.into(),
            config: Map::new(),
            children: None,
            else_children: None,
            catch_children: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Task>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_else_children(mut self, children: Vec<Task>) -> Self {
        self.else_children = Some(children);
        self
    }

    pub fn with_catch_children(mut self, children: Vec<Task>) -> Self {
        self.catch_children = Some(children);
        self
    }

    /// Label used in progress messages; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// The config mapping as a JSON object value.
    pub fn config_value(&self) -> Value {
        Value::Object(self.config.clone())
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn children(&self) -> &[Task] {
        self.children.as_deref().unwrap_or_default()
    }

    pub fn else_children(&self) -> &[Task] {
        self.else_children.as_deref().unwrap_or_default()
    }

    pub fn catch_children(&self) -> &[Task] {
        self.catch_children.as_deref().unwrap_or_default()
    }

    /// Number of nodes in the subtree rooted here, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .chain(self.else_children())
            .chain(self.catch_children())
            .map(Task::node_count)
            .sum::<usize>()
    }
}
