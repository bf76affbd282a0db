//! Orchestration plan model: the structured output of the queen's strategic
//! task analysis, plus the dispatch descriptors handed to the host runtime.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::worker::{Priority, WorkerType};

/// Orchestration status recorded on the plan itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Completed,
    Failed,
    Planning,
}

/// How the host runtime should schedule the assigned workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    #[default]
    Parallel,
    Sequential,
    Hybrid,
}

/// Individual worker assignment with strategic reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_type: WorkerType,
    #[serde(default)]
    pub priority: Priority,
    /// Specific focus area and objectives for this worker
    #[serde(default)]
    pub task_focus: String,
    /// Other worker types this assignment depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default = "default_duration")]
    pub estimated_duration: String,
    #[serde(default)]
    pub strategic_value: Priority,
    /// Strategic reasoning for including this worker
    #[serde(default = "default_rationale")]
    pub rationale: String,
}

fn default_duration() -> String {
    "1-2h".to_string()
}

fn default_rationale() -> String {
    "Required for task completion".to_string()
}

/// Service context surfaced to workers - factual mapping, never opinion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodebaseInsight {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default)]
    pub service_description: String,
    #[serde(default)]
    pub technology_stack: Vec<String>,
    #[serde(default)]
    pub interaction_points: Vec<String>,
}

/// Dispatch descriptor for one worker, consumed by the host runtime that
/// actually spawns execution units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDispatch {
    pub worker_type: WorkerType,
    /// Human-readable task description
    #[serde(default)]
    pub description: String,
    /// Full worker prompt text for spawn executors that accept it inline
    #[serde(default)]
    pub prompt: String,
}

/// The orchestration plan produced by the queen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: PlanStatus,

    /// Orchestrator's understanding of what needs to be accomplished
    #[serde(default)]
    pub task_summary: String,
    /// Technical complexity of the task itself (1-4)
    #[serde(default = "default_complexity_assessment")]
    pub complexity_assessment: u8,
    /// Coordination complexity (1-5), independent of technical complexity
    #[serde(default = "default_coordination_complexity")]
    pub coordination_complexity: u8,
    /// Why these workers were selected
    #[serde(default)]
    pub orchestration_rationale: String,
    #[serde(default = "default_total_duration")]
    pub estimated_total_duration: String,

    #[serde(default)]
    pub worker_assignments: Vec<WorkerAssignment>,
    #[serde(default)]
    pub execution_strategy: ExecutionStrategy,

    /// How workers should coordinate and hand off results
    #[serde(default)]
    pub coordination_notes: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub codebase_insights: Vec<CodebaseInsight>,

    /// Dispatch descriptors prepared for the host runtime
    #[serde(default)]
    pub task_execution_plan: Vec<TaskDispatch>,

    #[serde(default)]
    pub workers_spawned: Vec<String>,
    #[serde(default = "default_coordination_status")]
    pub coordination_status: String,
    #[serde(default)]
    pub monitoring_active: bool,
    #[serde(default)]
    pub session_path: String,
}

fn default_complexity_assessment() -> u8 {
    2
}

fn default_coordination_complexity() -> u8 {
    2
}

fn default_total_duration() -> String {
    "2-4h".to_string()
}

fn default_coordination_status() -> String {
    "planned".to_string()
}

impl OrchestrationPlan {
    /// Worker types named by the plan's assignments.
    pub fn assigned_worker_types(&self) -> Vec<WorkerType> {
        self.worker_assignments.iter().map(|a| a.worker_type).collect()
    }

    /// Validate the plan invariants:
    /// every dependency refers to an assignment present in the plan, the
    /// dependency graph is acyclic, and complexity bounds hold.
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.complexity_assessment) {
            bail!(
                "complexity assessment out of range: {}",
                self.complexity_assessment
            );
        }
        if !(1..=5).contains(&self.coordination_complexity) {
            bail!(
                "coordination complexity out of range: {}",
                self.coordination_complexity
            );
        }

        let assigned: BTreeSet<&str> = self
            .worker_assignments
            .iter()
            .map(|a| a.worker_type.as_str())
            .collect();

        for assignment in &self.worker_assignments {
            for dep in &assignment.dependencies {
                if !WorkerType::is_known(dep) {
                    bail!(
                        "assignment '{}' depends on unknown worker type '{}'",
                        assignment.worker_type,
                        dep
                    );
                }
                if !assigned.contains(dep.as_str()) {
                    bail!(
                        "assignment '{}' depends on '{}' which is not in the plan",
                        assignment.worker_type,
                        dep
                    );
                }
            }
        }

        if !self.dependency_graph_is_acyclic() {
            bail!("worker dependency graph contains a cycle");
        }

        Ok(())
    }

    /// Kahn's algorithm over the assignment dependency edges.
    pub fn dependency_graph_is_acyclic(&self) -> bool {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for assignment in &self.worker_assignments {
            in_degree.entry(assignment.worker_type.as_str()).or_insert(0);
            for dep in &assignment.dependencies {
                *in_degree.entry(assignment.worker_type.as_str()).or_insert(0) += 1;
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(assignment.worker_type.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(w, _)| *w)
            .collect();
        let mut visited = 0usize;

        while let Some(node) = ready.pop() {
            visited += 1;
            if let Some(children) = dependents.get(node) {
                for child in children {
                    let degree = in_degree.get_mut(child).expect("child was registered");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(child);
                    }
                }
            }
        }

        visited == in_degree.len()
    }
}
