// ABOUTME: Command implementations for the tasktree CLI
// ABOUTME: Handles execution of the run, validate, and init commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::config::Config;
use crate::engine::{
    ProgressEvent, ProgressReporter, ProgressStatus, ProgressSummary, TaskFlowEngine,
    TracingReporter,
};
use crate::parser::{FlowParser, FlowValidator, TaskFlow, ValidationReport};
use crate::tasks::ActionRegistry;

/// Prints each event as it arrives and keeps them for the run record.
struct ConsoleReporter {
    inner: TracingReporter,
}

impl ProgressReporter for ConsoleReporter {
    fn report(&mut self, event: ProgressEvent) {
        let marker = match event.status {
            ProgressStatus::Start => "▶",
            ProgressStatus::Success => "✓",
            ProgressStatus::Error => "✗",
        };
        println!("{} [{}] {}", marker, event.task_id, event.message);
        self.inner.report(event);
    }
}

/// What `run --output` writes.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub flow: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: ProgressSummary,
    pub events: Vec<ProgressEvent>,
    pub variables: IndexMap<String, Value>,
}

async fn load_flow(flow_path: &Path) -> Result<TaskFlow> {
    FlowParser::new()
        .parse_file(flow_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse task flow: {}", e))
}

/// Execute a task flow command
pub async fn run_flow(
    flow_path: PathBuf,
    overrides: IndexMap<String, Value>,
    dry_run: bool,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Starting task flow execution: {}", flow_path.display());

    let mut flow = load_flow(&flow_path).await?;
    info!("Loaded task flow: {} ({} tasks)", flow.name, flow.node_count());

    // Configured values first, then the document's, then command line overrides.
    let mut variables = config.variables.clone();
    variables.extend(std::mem::take(&mut flow.variables));
    variables.extend(overrides);
    flow.variables = variables;

    if dry_run {
        let report = FlowValidator::new().validate(&flow);
        print_report(&flow, &report);
        info!("Dry run - task flow not executed");
        return ensure_valid(&report);
    }

    let registry = ActionRegistry::simulated(config.latency);
    let mut engine = TaskFlowEngine::with_registry(registry).with_max_depth(config.max_depth);

    let cancel = engine.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling task flow");
            cancel.cancel();
        }
    });

    let mut reporter = ConsoleReporter {
        inner: TracingReporter::new(),
    };
    let started_at = Utc::now();
    let result = engine.execute_flow(&flow, &mut reporter).await;
    let finished_at = Utc::now();
    ctrl_c.abort();

    let summary = reporter.inner.log().summary();
    println!(
        "Task flow '{}' {}: {} started, {} succeeded, {} failed",
        flow.name,
        if result.is_ok() { "completed" } else { "failed" },
        summary.started,
        summary.succeeded,
        summary.failed
    );

    if let Some(output_path) = output {
        let record = RunRecord {
            flow: flow.name.clone(),
            started_at,
            finished_at,
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            summary,
            events: reporter.inner.into_log().into_events(),
            variables: engine.variables(),
        };

        let json_content = serde_json::to_string_pretty(&record)
            .map_err(|e| anyhow::anyhow!("Failed to serialize run record: {}", e))?;
        std::fs::write(&output_path, json_content).map_err(|e| {
            anyhow::anyhow!(
                "Failed to write output file '{}': {}",
                output_path.display(),
                e
            )
        })?;

        info!("Run record written to: {}", output_path.display());
    }

    result.map_err(|e| anyhow::anyhow!("Task flow execution failed: {}", e))
}

/// Validate a task flow file
pub async fn validate_flow(flow_path: PathBuf, _config: &Config) -> Result<()> {
    info!("Validating task flow: {}", flow_path.display());

    let flow = load_flow(&flow_path).await?;
    let report = FlowValidator::new().validate(&flow);
    print_report(&flow, &report);

    ensure_valid(&report)?;
    info!("Task flow validation completed successfully");
    Ok(())
}

fn print_report(flow: &TaskFlow, report: &ValidationReport) {
    if report.is_valid {
        println!("✓ Task flow '{}' is valid", flow.name);
    } else {
        println!("✗ Task flow '{}' is invalid", flow.name);
    }
    println!("  Tasks: {}", flow.node_count());
    println!("  Variables: {}", flow.variables.len());

    for error in &report.errors {
        println!("  error: {}", error);
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
}

fn ensure_valid(report: &ValidationReport) -> Result<()> {
    if report.is_valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Task flow validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

/// Initialize a new task flow file
pub async fn init_flow(name: String, output_dir: PathBuf, template: String) -> Result<()> {
    info!("Initializing task flow '{}' in {}", name, output_dir.display());

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let flow_file = output_dir.join(format!("{}.yaml", name));

    if flow_file.exists() {
        return Err(anyhow::anyhow!(
            "Task flow file already exists: {}",
            flow_file.display()
        ));
    }

    let flow_content = generate_flow_template(&name, &template)?;
    std::fs::write(&flow_file, flow_content)?;

    println!("Created task flow file: {}", flow_file.display());
    info!("Created task flow file: {}", flow_file.display());

    Ok(())
}

/// Generate task flow template content
fn generate_flow_template(name: &str, template_type: &str) -> Result<String> {
    match template_type {
        "basic" => Ok(generate_basic_template(name)),
        "control" => Ok(generate_control_template(name)),
        _ => Err(anyhow::anyhow!("Unknown template type: {}", template_type)),
    }
}

fn generate_basic_template(name: &str) -> String {
    format!(
        r#"name: {}
description: Open a page, read its title and take a screenshot

tasks:
  - id: open
    name: Open home page
    type: open_browser
    config:
      url: https://example.com
  - id: read_title
    name: Read title
    type: get_text
    config:
      selector: h1
      variable: title
  - id: capture
    name: Capture page
    type: screenshot
    config:
      filename: home.png
"#,
        name
    )
}

fn generate_control_template(name: &str) -> String {
    format!(
        r#"name: {}
description: Branching, looping, iteration and error containment

variables:
  pages: ["/", "/about", "/contact"]

tasks:
  - id: visit_pages
    name: Visit every page
    type: foreach
    config:
      items: pages
      itemVar: page
    children:
      - id: guarded_visit
        name: Visit page
        type: try
        children:
          - id: open_page
            name: Open page
            type: open_browser
            config:
              url: https://example.com
        catchChildren:
          - id: record_failure
            name: Capture failure
            type: screenshot
            config:
              filename: failure.png
  - id: poll
    name: Poll three times
    type: while
    config:
      condition: "count < 3"
      maxIterations: 3
    children:
      - id: pause
        name: Pause
        type: wait
        config:
          duration: 100
  - id: check_count
    name: Check loop count
    type: if
    config:
      condition: "count === 3"
    children:
      - id: done_shot
        name: Capture result
        type: screenshot
        config:
          filename: done.png
    elseChildren:
      - id: retry_shot
        name: Capture unexpected state
        type: screenshot
        config:
          filename: unexpected.png
"#,
        name
    )
}
