// ABOUTME: wait action that suspends the flow for a configured number of milliseconds
// ABOUTME: Accepts the duration as a number or a numeric string

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{parse_config, simulate, ActionOutput, ActionResult, LeafAction};
use crate::parser::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Milliseconds to wait
    #[serde(deserialize_with = "millis")]
    pub duration: u64,
}

fn millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(ms) if ms >= 0.0 && ms.is_finite() => Ok(ms as u64),
        _ => Err(serde::de::Error::custom(format!(
            "duration must be a non-negative number of milliseconds, got {}",
            value
        ))),
    }
}

pub struct WaitAction;

#[async_trait]
impl LeafAction for WaitAction {
    async fn execute(&self, _task_id: &str, config: Value) -> ActionResult<ActionOutput> {
        let config: WaitConfig = parse_config(&self.task_type(), config)?;

        info!("Waiting {}ms", config.duration);
        simulate(Duration::from_millis(config.duration)).await;

        Ok(ActionOutput::none())
    }

    fn task_type(&self) -> TaskType {
        TaskType::Wait
    }

    fn validate_config(&self, config: &Value) -> ActionResult<()> {
        parse_config::<WaitConfig>(&self.task_type(), config.clone()).map(|_| ())
    }
}
