//! CLI configuration: YAML file, environment overrides, and the project
//! `.env` loader.
//!
//! Priority: config file > environment variables > defaults, with CLI
//! arguments applied on top in main.rs.

use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};

use crate::monitor::{DEFAULT_MONITOR_INTERVAL_SECS, DEFAULT_STALL_MULTIPLIER};
use crate::router::DEFAULT_BASE_URL;

/// Main CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    #[serde(default)]
    pub model_service: ModelServiceConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub worker: WorkerSectionConfig,
    #[serde(default)]
    pub monitor: MonitorSectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelServiceConfig {
    /// Base URL of the local model API service
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ModelServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Override the orchestrator's logical model
    pub model_override: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerSectionConfig {
    /// Override the workers' logical model
    pub model_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSectionConfig {
    /// Seconds between monitor iterations
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,
    /// Stall threshold as a multiple of the interval
    #[serde(default = "default_stall_multiplier")]
    pub stall_multiplier: u32,
}

fn default_monitor_interval() -> u64 {
    DEFAULT_MONITOR_INTERVAL_SECS
}

fn default_stall_multiplier() -> u32 {
    DEFAULT_STALL_MULTIPLIER
}

impl Default for MonitorSectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
            stall_multiplier: default_stall_multiplier(),
        }
    }
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            model_service: ModelServiceConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            worker: WorkerSectionConfig::default(),
            monitor: MonitorSectionConfig::default(),
        }
    }
}

impl HiveConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HiveConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is absent.
    pub fn load_or_default(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    /// Apply `HIVE_MIND_*` environment variable overrides.
    ///
    /// Supported variables:
    /// - HIVE_MIND_SERVICE_URL: model API service base URL
    /// - HIVE_MIND_ORCHESTRATOR_MODEL: logical model for orchestration
    /// - HIVE_MIND_WORKER_MODEL: logical model for workers
    /// - HIVE_MIND_MONITOR_INTERVAL: monitor interval in seconds
    /// - HIVE_MIND_STALL_MULTIPLIER: stall threshold multiplier
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("HIVE_MIND_SERVICE_URL")
            && !val.is_empty()
        {
            self.model_service.base_url = val;
        }

        if let Ok(val) = std::env::var("HIVE_MIND_ORCHESTRATOR_MODEL")
            && !val.is_empty()
        {
            self.orchestrator.model_override = Some(val);
        }

        if let Ok(val) = std::env::var("HIVE_MIND_WORKER_MODEL")
            && !val.is_empty()
        {
            self.worker.model_override = Some(val);
        }

        if let Ok(val) = std::env::var("HIVE_MIND_MONITOR_INTERVAL")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.monitor.interval_secs = secs.max(1);
        }

        if let Ok(val) = std::env::var("HIVE_MIND_STALL_MULTIPLIER")
            && let Ok(multiplier) = val.parse::<u32>()
        {
            self.monitor.stall_multiplier = multiplier.max(1);
        }

        self
    }

    /// Load configuration with environment overrides applied.
    pub fn load_with_env(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        Self::load_or_default(path).map(|c| c.apply_env_overrides())
    }
}

static ENV_LOADED: Once = Once::new();

/// Load the project-root `.env` into the process environment.
///
/// Idempotent: repeated calls are no-ops, and a missing file is fine.
pub fn load_project_env(project_root: &Path) {
    ENV_LOADED.call_once(|| {
        let _ = dotenvy::from_path(project_root.join(".env"));
    });
}
