// ABOUTME: Simulated screenshot action that pretends to capture the page
// ABOUTME: Requires the filename the capture would be saved as

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    pub filename: String,
}

pub struct ScreenshotAction {
    latency: Duration,
}

impl ScreenshotAction {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl LeafAction for ScreenshotAction {
    async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: ScreenshotConfig = parse_config(&self.task_type(), config)?;

        info!("Saving screenshot as: {}", config.filename);
        simulate(self.latency).await;

        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::Screenshot
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<ScreenshotConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
