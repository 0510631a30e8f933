// ABOUTME: Simulated open_browser action that pretends to load a page
// ABOUTME: Requires a url and performs no real I/O

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenBrowserConfig {
    pub url: String,
}

pub struct OpenBrowserAction {
    latency: Duration,
}

impl OpenBrowserAction {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl LeafAction for OpenBrowserAction {
    async fn execute(&self, task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: OpenBrowserConfig = parse_config(&self.task_type(), config)?;

        info!("Opening page: {} (task {})", config.url, task_id);
        simulate(self.latency).await;

        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::OpenBrowser
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<OpenBrowserConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
