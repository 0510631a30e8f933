// ABOUTME: Simulated click_element action that pretends to click a located element
// ABOUTME: Requires a selector; the description is only used for logging

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickElementConfig {
    pub selector: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub struct ClickElementAction {
    latency: Duration,
}

impl ClickElementAction {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl LeafAction for ClickElementAction {
    async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: ClickElementConfig = parse_config(&self.task_type(), config)?;

        info!(
            "Clicking element: {} ({})",
            config.selector,
            config.description.as_deref().unwrap_or("no description")
        );
        simulate(self.latency).await;

        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::ClickElement
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<ClickElementConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
