// ABOUTME: Configuration management for the tasktree application
// ABOUTME: Loads settings from config files and applies environment variable overrides

use anyhow::{Context, Result};
use humantime_serde::re::humantime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::engine::DEFAULT_MAX_DEPTH;
use crate::tasks::LatencyProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Simulated latency of the stub leaf actions
    #[serde(default)]
    pub latency: LatencyProfile,

    /// Seeded into every run before the flow's own variables
    #[serde(default)]
    pub variables: IndexMap<String, Value>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            latency: LatencyProfile::default(),
            variables: IndexMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid config {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = [
            PathBuf::from("tasktree.yaml"),
            PathBuf::from("tasktree.yml"),
            PathBuf::from(".tasktree.yaml"),
            PathBuf::from(".tasktree.yml"),
        ];

        for path in possible_paths {
            if path.exists() {
                return path;
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".tasktree").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default path (may not exist)
        PathBuf::from("tasktree.yaml")
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("TASKTREE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TASKTREE_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(max_depth) = std::env::var("TASKTREE_MAX_DEPTH") {
            self.max_depth = max_depth
                .parse()
                .with_context(|| format!("Invalid TASKTREE_MAX_DEPTH '{}'", max_depth))?;
        }

        if let Ok(latency) = std::env::var("TASKTREE_SIMULATED_LATENCY") {
            let latency = humantime::parse_duration(&latency)
                .with_context(|| format!("Invalid TASKTREE_SIMULATED_LATENCY '{}'", latency))?;
            self.latency = LatencyProfile::uniform(latency);
        }

        Ok(())
    }
}
