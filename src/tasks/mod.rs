// ABOUTME: Leaf action implementations invoked for non-control-flow task types
// ABOUTME: Defines the LeafAction contract, the registry, and the simulated browser actions

pub mod click_element;
pub mod error;
pub mod get_text;
pub mod input_text;
pub mod open_browser;
pub mod screenshot;
pub mod wait;

pub use error::{ActionError, ActionResult};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::parser::TaskType;

/// Config key naming the variable a leaf output is stored under.
pub const OUTPUT_VARIABLE_KEY: &str = "variable";

/// An external unit of work behind one leaf task type.
///
/// Implementations never see the variable store. Anything later tasks should
/// read is returned as output and stored by the engine under the variable
/// named in the task config.
#[async_trait]
pub trait LeafAction: Send + Sync {
    async fn execute(&self, task_id: &str, config: Value) -> ActionResult<ActionOutput>;

    fn task_type(&self) -> TaskType;
    fn validate_config(&self, config: &Value) -> ActionResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    pub value: Option<Value>,
}

impl ActionOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

/// Simulated latency of each stub action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyProfile {
    #[serde(with = "humantime_serde")]
    pub open_browser: Duration,
    #[serde(with = "humantime_serde")]
    pub click_element: Duration,
    #[serde(with = "humantime_serde")]
    pub input_text: Duration,
    #[serde(with = "humantime_serde")]
    pub get_text: Duration,
    #[serde(with = "humantime_serde")]
    pub screenshot: Duration,
}

impl LatencyProfile {
    /// No simulated latency at all; `wait` still honours its duration.
    pub fn instant() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(latency: Duration) -> Self {
        Self {
            open_browser: latency,
            click_element: latency,
            input_text: latency,
            get_text: latency,
            screenshot: latency,
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            open_browser: Duration::from_millis(500),
            click_element: Duration::from_millis(300),
            input_text: Duration::from_millis(300),
            get_text: Duration::from_millis(300),
            screenshot: Duration::from_millis(400),
        }
    }
}

pub struct ActionRegistry {
    actions: HashMap<TaskType, Box<dyn LeafAction>>,
}

impl ActionRegistry {
    /// Registry with every simulated action at its default latency
    pub fn new() -> Self {
        Self::simulated(LatencyProfile::default())
    }

    pub fn simulated(latency: LatencyProfile) -> Self {
        let mut registry = Self::empty();

        registry.register(Box::new(open_browser::OpenBrowserAction::new(
            latency.open_browser,
        )));
        registry.register(Box::new(click_element::ClickElementAction::new(
            latency.click_element,
        )));
        registry.register(Box::new(input_text::InputTextAction::new(
            latency.input_text,
        )));
        registry.register(Box::new(wait::WaitAction));
        registry.register(Box::new(get_text::GetTextAction::new(latency.get_text)));
        registry.register(Box::new(screenshot::ScreenshotAction::new(
            latency.screenshot,
        )));

        registry
    }

    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Install an action, replacing any previous one for the same type.
    pub fn register(&mut self, action: Box<dyn LeafAction>) {
        self.actions.insert(action.task_type(), action);
    }

    pub fn get(&self, task_type: &TaskType) -> Option<&dyn LeafAction> {
        self.actions.get(task_type).map(|action| action.as_ref())
    }

    pub fn validate_task_config(&self, task_type: &TaskType, config: &Value) -> ActionResult<()> {
        match self.get(task_type) {
            Some(action) => action.validate_config(config),
            None => Err(ActionError::InvalidConfig {
                task_type: task_type.to_string(),
                reason: "no action registered for this task type".to_string(),
            }),
        }
    }

    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.actions.keys().map(|t| t.to_string()).collect();
        types.sort();
        types
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.supported_types())
            .finish()
    }
}

/// Deserialize a task config into an action's typed config.
pub(crate) fn parse_config<T: DeserializeOwned>(task_type: &TaskType, config: Value) -> ActionResult<T> {
    serde_json::from_value(config).map_err(|e| ActionError::InvalidConfig {
        task_type: task_type.to_string(),
        reason: e.to_string(),
    })
}

/// Simulate the action's work without blocking the runtime.
pub(crate) async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_covers_every_leaf_type() {
        let registry = ActionRegistry::new();
        for task_type in TaskType::LEAF_TYPES {
            assert!(registry.get(&task_type).is_some(), "missing {}", task_type);
        }
        assert!(registry.get(&TaskType::If).is_none());
        assert_eq!(registry.supported_types().len(), 6);
    }

    #[test]
    fn test_validate_unregistered_type() {
        let registry = ActionRegistry::empty();
        let result = registry.validate_task_config(&TaskType::Wait, &json!({}));
        assert!(matches!(result, Err(ActionError::InvalidConfig { .. })));
    }

    struct EchoAction;

    #[async_trait]
    impl LeafAction for EchoAction {
        async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
            Ok(ActionOutput::with_value(config))
        }

        fn task_type(&self) -> TaskType {
            TaskType::Screenshot
        }

        fn validate_config(&self, _config: &Value) -> ActionResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_replaces_stub() {
        let mut registry = ActionRegistry::simulated(LatencyProfile::instant());
        registry.register(Box::new(EchoAction));

        let action = registry.get(&TaskType::Screenshot).unwrap();
        let output = action.execute("s1", json!({"a": 1})).await.unwrap();
        assert_eq!(output.value, Some(json!({"a": 1})));
        assert_eq!(registry.supported_types().len(), 6);
    }

    #[test]
    fn test_latency_profile_from_yaml() {
        let yaml = r#"
open_browser: 1s
get_text: 0s
screenshot: 250ms
"#;
        let profile: LatencyProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.open_browser, Duration::from_secs(1));
        assert_eq!(profile.get_text, Duration::ZERO);
        assert_eq!(profile.click_element, Duration::from_millis(300));
    }
}
