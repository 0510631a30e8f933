// ABOUTME: Handlers for the if, while, foreach and try control-flow nodes
// ABOUTME: Each handler recurses into the runner for its child sequences

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ExecutionError, Result};
use super::executor::FlowRunner;
use super::scope::{LayeredScope, Scope};
use super::variables::{COUNTER_VAR, ERROR_VAR, INDEX_VAR, ITERATION_VAR};
use crate::condition;
use crate::parser::Task;

const DEFAULT_ITEM_VAR: &str = "item";

#[derive(Debug, Clone, Deserialize)]
pub struct IfConfig {
    #[serde(default, deserialize_with = "expression")]
    pub condition: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhileConfig {
    #[serde(default, deserialize_with = "expression")]
    pub condition: String,
    #[serde(default, alias = "max_iterations", deserialize_with = "iteration_limit")]
    pub max_iterations: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeachConfig {
    #[serde(default)]
    pub items: Value,
    #[serde(default = "default_item_var", alias = "item_var")]
    pub item_var: String,
}

fn default_item_var() -> String {
    DEFAULT_ITEM_VAR.to_string()
}

/// Conditions are normally text, but YAML turns `condition: true` into a bool.
fn expression<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        value @ (Value::Bool(_) | Value::Number(_)) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "condition must be an expression, got {}",
            other
        ))),
    }
}

fn iteration_limit<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(0.0),
        _ => None,
    };

    parsed.ok_or_else(|| {
        serde::de::Error::custom(format!("maxIterations must be a number, got {}", value))
    })
}

fn parse_config<T: DeserializeOwned>(task: &Task) -> Result<T> {
    serde_json::from_value(task.config_value()).map_err(|e| {
        ExecutionError::InvalidConfiguration {
            task_id: task.id.clone(),
            reason: e.to_string(),
        }
    })
}

impl FlowRunner<'_> {
    fn check(&self, condition: &str, scope: &Scope) -> bool {
        if condition.trim().is_empty() {
            warn!("No condition given, treating it as false");
            return false;
        }
        let lookup = LayeredScope::new(scope, &*self.variables);
        condition::evaluate(condition, &lookup)
    }

    pub(super) async fn run_if(&mut self, task: &Task, scope: &Scope, depth: usize) -> Result<()> {
        let config: IfConfig = parse_config(task)?;
        let result = self.check(&config.condition, scope);

        info!("IF condition: {} = {}", config.condition, result);

        if result && !task.children().is_empty() {
            debug!("Running THEN branch of {}", task.id);
            self.run_sequence(task.children(), scope, depth + 1).await?;
        } else if !result && !task.else_children().is_empty() {
            debug!("Running ELSE branch of {}", task.id);
            self.run_sequence(task.else_children(), scope, depth + 1)
                .await?;
        }

        Ok(())
    }

    pub(super) async fn run_while(
        &mut self,
        task: &Task,
        scope: &Scope,
        depth: usize,
    ) -> Result<()> {
        let config: WhileConfig = parse_config(task)?;
        let mut iterations: u64 = 0;

        info!("WHILE loop started: {}", config.condition);

        while self.check(&config.condition, scope) && (iterations as f64) < config.max_iterations {
            debug!("WHILE iteration {}", iterations + 1);

            if !task.children().is_empty() {
                let local = scope.child().bind(ITERATION_VAR, iterations);
                self.run_sequence(task.children(), &local, depth + 1).await?;
            }

            iterations += 1;
            self.variables.set(COUNTER_VAR, iterations);

            if iterations as f64 >= config.max_iterations {
                warn!(
                    "WHILE loop {} reached maxIterations ({})",
                    task.id, config.max_iterations
                );
                break;
            }
        }

        info!("WHILE loop finished after {} iterations", iterations);
        Ok(())
    }

    pub(super) async fn run_foreach(
        &mut self,
        task: &Task,
        scope: &Scope,
        depth: usize,
    ) -> Result<()> {
        let config: ForeachConfig = parse_config(task)?;
        let items = match self.resolve_items(&config.items) {
            Value::Array(items) => items,
            other => {
                return Err(ExecutionError::InvalidIterable {
                    task_id: task.id.clone(),
                    found: condition::evaluator::type_name(&other).to_string(),
                })
            }
        };

        info!("FOREACH over {} items", items.len());

        for (i, item) in items.into_iter().enumerate() {
            debug!("FOREACH item {}: {} = {}", i, config.item_var, item);

            self.variables.set(config.item_var.as_str(), item.clone());
            self.variables.set(INDEX_VAR, i);

            if !task.children().is_empty() {
                let local = scope
                    .child()
                    .bind(config.item_var.as_str(), item)
                    .bind(INDEX_VAR, i);
                self.run_sequence(task.children(), &local, depth + 1).await?;
            }
        }

        info!("FOREACH finished");
        Ok(())
    }

    /// Array text is parsed first; anything else names a store variable.
    /// Missing items and falsy variables iterate nothing.
    fn resolve_items(&self, items: &Value) -> Value {
        let text = match items {
            Value::Null => return Value::Array(Vec::new()),
            Value::String(text) => text,
            other => return other.clone(),
        };

        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed,
            Err(_) => match self.variables.get(text) {
                Some(value) if condition::is_truthy(value) => value.clone(),
                _ => {
                    debug!("FOREACH variable '{}' is empty, iterating nothing", text);
                    Value::Array(Vec::new())
                }
            },
        }
    }

    pub(super) async fn run_try(&mut self, task: &Task, scope: &Scope, depth: usize) -> Result<()> {
        info!("TRY block started");

        let failure = if task.children().is_empty() {
            None
        } else {
            match self.run_sequence(task.children(), scope, depth + 1).await {
                Ok(()) => None,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => Some(e),
            }
        };

        let Some(failure) = failure else {
            info!("TRY block completed");
            return Ok(());
        };

        let message = failure.to_string();
        info!("TRY caught failure from {}: {}", failure.task_id(), message);
        self.variables.set(ERROR_VAR, message.as_str());

        if !task.catch_children().is_empty() {
            debug!("Running CATCH block of {}", task.id);
            let local = scope.child().bind(ERROR_VAR, message);
            self.run_sequence(task.catch_children(), &local, depth + 1)
                .await?;
        }

        Ok(())
    }
}
