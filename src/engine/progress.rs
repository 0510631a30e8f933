// ABOUTME: Progress reporting contract invoked at task start, success and error
// ABOUTME: Provides the event types, a recording reporter, and a tracing-backed reporter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Start,
    Success,
    Error,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Start => "start",
            ProgressStatus::Success => "success",
            ProgressStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub status: ProgressStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        task_id: impl Into<String>,
        status: ProgressStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives progress events synchronously, in execution order.
pub trait ProgressReporter: Send {
    fn report(&mut self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&str, ProgressStatus, &str) + Send,
{
    fn report(&mut self, event: ProgressEvent) {
        self(&event.task_id, event.status, &event.message)
    }
}

/// Keeps every event in arrival order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressLog {
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }

    /// `(task_id, status)` pairs, convenient for asserting on ordering.
    pub fn trace(&self) -> Vec<(String, ProgressStatus)> {
        self.events
            .iter()
            .map(|event| (event.task_id.clone(), event.status))
            .collect()
    }

    pub fn count(&self, status: ProgressStatus) -> usize {
        self.events
            .iter()
            .filter(|event| event.status == status)
            .count()
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            started: self.count(ProgressStatus::Start),
            succeeded: self.count(ProgressStatus::Success),
            failed: self.count(ProgressStatus::Error),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl ProgressReporter for ProgressLog {
    fn report(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressSummary {
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Logs every event through `tracing` and keeps a copy for the final summary.
#[derive(Debug, Default)]
pub struct TracingReporter {
    log: ProgressLog,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn into_log(self) -> ProgressLog {
        self.log
    }
}

impl ProgressReporter for TracingReporter {
    fn report(&mut self, event: ProgressEvent) {
        match event.status {
            ProgressStatus::Error => error!(task_id = %event.task_id, "{}", event.message),
            _ => info!(task_id = %event.task_id, status = %event.status, "{}", event.message),
        }
        self.log.report(event);
    }
}
