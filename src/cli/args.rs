// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for tasktree

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tasktree")]
#[command(about = "Interpreter for hierarchical task flows with branching, loops and error containment")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a task flow from a YAML or JSON file
    Run {
        #[arg(help = "Path to task flow file")]
        flow: PathBuf,

        #[arg(
            short = 'V',
            long = "var",
            help = "Seed a flow variable (key=value, value parsed as JSON when possible)"
        )]
        vars: Vec<String>,

        #[arg(long, help = "Dry run - validate without executing")]
        dry_run: bool,

        #[arg(short, long, help = "Write progress events and final variables as JSON")]
        output: Option<PathBuf>,

        #[arg(long, help = "Maximum nesting depth of control-flow blocks")]
        max_depth: Option<usize>,
    },

    /// Validate a task flow file without executing
    Validate {
        #[arg(help = "Path to task flow file")]
        flow: PathBuf,
    },

    /// Initialize a new task flow file from template
    Init {
        #[arg(help = "Name of the task flow to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, help = "Task flow template type", default_value = "basic")]
        template: String,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format. Values that are valid JSON keep
    /// their type; anything else is taken as a string.
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<IndexMap<String, Value>> {
        let mut variables = IndexMap::new();

        for var in vars {
            if let Some((key, value)) = var.split_once('=') {
                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                variables.insert(key.to_string(), value);
            } else {
                return Err(anyhow::anyhow!(
                    "Invalid variable format '{}'. Expected 'key=value'",
                    var
                ));
            }
        }

        Ok(variables)
    }
}
