//! Worker-facing data model: the fixed worker-type enumeration, the embedded
//! worker configuration, and the canonical output document every worker
//! produces.
//!
//! Every field carries a schema-level default so a sparse model response
//! round-trips through defaults instead of failing validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The fixed enumeration of worker types the core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WorkerType {
    Analyzer,
    Architect,
    Backend,
    Designer,
    Devops,
    Frontend,
    Researcher,
    Test,
    Scribe,
    Queen,
}

impl WorkerType {
    /// All worker types, in stable order.
    pub const ALL: [WorkerType; 10] = [
        WorkerType::Analyzer,
        WorkerType::Architect,
        WorkerType::Backend,
        WorkerType::Designer,
        WorkerType::Devops,
        WorkerType::Frontend,
        WorkerType::Researcher,
        WorkerType::Test,
        WorkerType::Scribe,
        WorkerType::Queen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerType::Analyzer => "analyzer-worker",
            WorkerType::Architect => "architect-worker",
            WorkerType::Backend => "backend-worker",
            WorkerType::Designer => "designer-worker",
            WorkerType::Devops => "devops-worker",
            WorkerType::Frontend => "frontend-worker",
            WorkerType::Researcher => "researcher-worker",
            WorkerType::Test => "test-worker",
            WorkerType::Scribe => "scribe-worker",
            WorkerType::Queen => "queen-orchestrator",
        }
    }

    /// Memory-bank tags this worker type may access.
    pub fn tag_access(self) -> Vec<String> {
        let tags: &[&str] = match self {
            WorkerType::Analyzer => &["security", "performance", "quality"],
            WorkerType::Architect => &["architecture", "patterns", "design"],
            WorkerType::Backend => &["backend", "database", "api"],
            WorkerType::Designer => &["design", "ux", "accessibility"],
            WorkerType::Devops => &["infrastructure", "deployment", "monitoring"],
            WorkerType::Frontend => &["frontend", "ui", "components"],
            WorkerType::Researcher => &["research", "patterns", "standards"],
            WorkerType::Test => &["testing", "quality", "coverage"],
            WorkerType::Scribe => &["documentation", "synthesis"],
            WorkerType::Queen => &["coordination", "orchestration"],
        };
        tags.iter().map(|t| t.to_string()).collect()
    }

    pub fn is_known(name: &str) -> bool {
        WorkerType::from_str(name).is_ok()
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkerType::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| format!("unknown worker type: '{}'", s))
    }
}

impl From<WorkerType> for String {
    fn from(value: WorkerType) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for WorkerType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WorkerType::from_str(&value)
    }
}

/// Terminal status a worker reports in its output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerReportStatus {
    #[default]
    Completed,
    Blocked,
    Failed,
}

/// Execution priority shared by assignments and worker configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// Severity of a finding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// A single analysis finding emitted by a worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Configuration for a spawned worker, embedded in its output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub worker_type: String,
    #[serde(default)]
    pub session_id: String,
    /// Memory bank tags this worker can access
    #[serde(default)]
    pub tag_access: Vec<String>,
    /// Timeout in seconds before escalation
    #[serde(default = "default_escalation_timeout")]
    pub escalation_timeout: u64,
    /// Escalation chain for blocked/failed workers
    #[serde(default = "default_escalation_chain")]
    pub escalation_chain: Vec<String>,
    /// Task complexity level (1=simple, 4=complex)
    #[serde(default = "default_complexity")]
    pub complexity_level: u8,
    /// Specific task for this worker
    #[serde(default)]
    pub task_description: String,
    /// Other workers this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

fn default_escalation_timeout() -> u64 {
    300
}

fn default_escalation_chain() -> Vec<String> {
    vec![WorkerType::Queen.as_str().to_string()]
}

fn default_complexity() -> u8 {
    2
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_type: String::new(),
            session_id: String::new(),
            tag_access: Vec::new(),
            escalation_timeout: default_escalation_timeout(),
            escalation_chain: default_escalation_chain(),
            complexity_level: default_complexity(),
            task_description: String::new(),
            dependencies: Vec::new(),
            priority: Priority::Medium,
        }
    }
}

impl WorkerConfig {
    /// Standard config for a worker type within a session.
    pub fn for_worker(worker_type: WorkerType, session_id: &str, task_description: &str) -> Self {
        Self {
            worker_type: worker_type.as_str().to_string(),
            session_id: session_id.to_string(),
            tag_access: worker_type.tag_access(),
            task_description: task_description.to_string(),
            ..Self::default()
        }
    }
}

/// Standard summary block used by all workers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerSummary {
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Standard metrics block used by all workers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMetrics {
    #[serde(default)]
    pub items_analyzed: u64,
    #[serde(default)]
    pub issues_found: u64,
    #[serde(default)]
    pub severity_breakdown: BTreeMap<String, u64>,
}

/// Cross-worker dependency tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerDependencies {
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub handoffs: Vec<String>,
}

/// Canonical worker output format.
///
/// This is the base document every worker writes to `workers/json/`;
/// worker-type-specific reports extend it with typed findings and domain
/// scores (see `worker::outputs`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerOutput {
    #[serde(default)]
    pub worker: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: WorkerReportStatus,
    #[serde(default)]
    pub summary: WorkerSummary,
    #[serde(default)]
    pub analysis: Map<String, Value>,
    #[serde(default)]
    pub metrics: WorkerMetrics,
    #[serde(default)]
    pub dependencies: WorkerDependencies,
    #[serde(default)]
    pub files_examined: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<String>,
    /// Full notes content for `workers/notes/<prefix>_notes.md`
    #[serde(default)]
    pub notes_markdown: String,
    /// Worker configuration embedded in the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<WorkerConfig>,
}
