// ABOUTME: Simulated get_text action that pretends to extract an element's text
// ABOUTME: Returns the extracted text so the engine can store it under the configured variable

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTextConfig {
    pub selector: String,
    /// Read by the engine, which stores the output under this name.
    pub variable: String,
}

pub struct GetTextAction {
    latency: Duration,
}

impl GetTextAction {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl LeafAction for GetTextAction {
    async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: GetTextConfig = parse_config(&self.task_type(), config)?;

        let text = format!("Simulated text content from {}", config.selector);
        info!("Extracted text for {}: {}", config.variable, text);
        simulate(self.latency).await;

        Ok(ActionOutput::with_value(text))
    }

    fn task_type(&self) -> TaskType {
        TaskType::GetText
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<GetTextConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
