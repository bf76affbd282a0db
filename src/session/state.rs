//! Session state document types (STATE.json).
//!
//! The on-disk document is mutated only through the atomic updater in
//! [`super::store`], which works at the JSON level; these types give the
//! creation path and readers a typed view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::iso_now;

/// Coordinator name recorded in every session document.
pub const COORDINATOR: &str = "queen-orchestrator";

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Active,
    WorkersSpawning,
    Completed,
    Failed,
}

/// Per-worker status tracked inside `worker_configs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    NotStarted,
    Running,
    Blocked,
    Completed,
    Failed,
}

/// Coordination progress shared by the orchestrator, workers, and monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationStatus {
    /// Current coordination phase (e.g., "planning", "worker_preparation")
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub workers_spawned: Vec<String>,
    #[serde(default)]
    pub workers_completed: Vec<String>,
    #[serde(default)]
    pub workers_pending: Vec<String>,
    #[serde(default)]
    pub workers_failed: Vec<String>,
    /// Set once the monitor has gated synthesis
    #[serde(default)]
    pub synthesis_ready: bool,
}

/// Per-worker configuration and runtime slot inside the session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSlot {
    /// Domain tags this worker may read from the memory bank
    #[serde(default)]
    pub tag_access: Vec<String>,
    /// Seconds before a blocked worker escalates
    #[serde(default = "default_escalation_timeout")]
    pub escalation_timeout: u64,
    /// Escalation chain for blocked/failed workers
    #[serde(default = "default_escalation_chain")]
    pub escalation_chain: Vec<String>,
    /// Task complexity level (1=simple, 4=complex)
    #[serde(default = "default_complexity")]
    pub complexity_level: u8,
    /// Specific task focus for this worker
    #[serde(default)]
    pub task_description: String,
    /// Other workers this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub status: WorkerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Domain score snapshot recorded at completion; opaque to the core
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<String, f64>,
}

fn default_escalation_timeout() -> u64 {
    300
}

fn default_escalation_chain() -> Vec<String> {
    vec![COORDINATOR.to_string()]
}

fn default_complexity() -> u8 {
    2
}

impl WorkerSlot {
    /// Fresh slot for a newly assigned worker.
    pub fn assigned(tags: Vec<String>, complexity_level: u8, task_description: String) -> Self {
        Self {
            tag_access: tags,
            escalation_timeout: default_escalation_timeout(),
            escalation_chain: default_escalation_chain(),
            complexity_level,
            task_description,
            dependencies: Vec::new(),
            status: WorkerStatus::NotStarted,
            started_at: None,
            completed_at: None,
            scores: BTreeMap::new(),
        }
    }
}

/// Session-level progress metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub events_logged: u64,
    #[serde(default)]
    pub workers_total: u64,
    #[serde(default)]
    pub completion_percentage: f64,
}

/// The full STATE.json document.
///
/// Unknown keys introduced by deep-merge patches survive round-trips through
/// the flattened `extra` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub task: String,
    pub created_at: String,
    pub last_updated: String,
    pub complexity_level: u8,
    pub coordinator: String,
    pub status: SessionStatus,
    pub update_count: u64,
    #[serde(default)]
    pub coordination_status: CoordinationStatus,
    #[serde(default)]
    pub worker_configs: BTreeMap<String, WorkerSlot>,
    #[serde(default)]
    pub metrics: SessionMetrics,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionState {
    /// Initial document written by `create_session`.
    pub fn new(session_id: &str, task: &str, complexity_level: u8) -> Self {
        let now = iso_now();
        Self {
            session_id: session_id.to_string(),
            task: task.to_string(),
            created_at: now.clone(),
            last_updated: now.clone(),
            complexity_level,
            coordinator: COORDINATOR.to_string(),
            status: SessionStatus::Initializing,
            update_count: 0,
            coordination_status: CoordinationStatus {
                phase: "planning".to_string(),
                ..CoordinationStatus::default()
            },
            worker_configs: BTreeMap::new(),
            metrics: SessionMetrics {
                start_time: now,
                ..SessionMetrics::default()
            },
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SessionState::new("2025-08-31-10-22-audit-crypto-data-service", "Audit", 3);
        assert_eq!(state.update_count, 0);
        assert_eq!(state.complexity_level, 3);
        assert_eq!(state.status, SessionStatus::Initializing);
        assert_eq!(state.coordinator, COORDINATOR);
        assert_eq!(state.coordination_status.phase, "planning");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(SessionStatus::WorkersSpawning).unwrap();
        assert_eq!(json, serde_json::json!("workers_spawning"));
        let json = serde_json::to_value(WorkerStatus::NotStarted).unwrap();
        assert_eq!(json, serde_json::json!("not_started"));
    }

    #[test]
    fn test_extra_keys_survive_roundtrip() {
        let mut state = SessionState::new("id", "task", 2);
        state
            .extra
            .insert("target_service".to_string(), Value::String("api".into()));
        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.extra.get("target_service").unwrap(), "api");
    }

    #[test]
    fn test_worker_slot_defaults() {
        let slot: WorkerSlot = serde_json::from_value(serde_json::json!({
            "status": "running"
        }))
        .unwrap();
        assert_eq!(slot.escalation_timeout, 300);
        assert_eq!(slot.escalation_chain, vec![COORDINATOR.to_string()]);
        assert_eq!(slot.complexity_level, 2);
    }
}
