// ABOUTME: Simulated input_text action that pretends to type into an element
// ABOUTME: Requires a selector and the text to enter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTextConfig {
    pub selector: String,
    pub text: String,
}

pub struct InputTextAction {
    latency: Duration,
}

impl InputTextAction {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl LeafAction for InputTextAction {
    async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: InputTextConfig = parse_config(&self.task_type(), config)?;

        info!("Typing into {}: {}", config.selector, config.text);
        simulate(self.latency).await;

        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::InputText
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<InputTextConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
