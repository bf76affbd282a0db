//! Structured event and debug logging over the session streams.
//!
//! EVENTS.jsonl is the authoritative timeline; DEBUG.jsonl is diagnostic.
//! Logging is best-effort from the caller's perspective: a failed append
//! never aborts orchestration or worker work, but the failure itself is
//! reported as a debug record on stderr.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::iso_now;
use super::store::SessionStore;

/// Event types emitted by the core. Not exhaustive; workers may add their
/// own milestone types as long as they stay short snake_case strings.
pub mod event_types {
    pub const SESSION_CREATED: &str = "session_created";
    pub const QUEEN_SPAWNED: &str = "queen_spawned";
    pub const TASKS_ASSIGNED: &str = "tasks_assigned";
    pub const WORKER_PROMPTS_CREATED: &str = "worker_prompts_created";
    pub const WORKER_SPAWNED: &str = "worker_spawned";
    pub const PROMPT_FILE_READ: &str = "prompt_file_read";
    pub const ANALYSIS_STARTED: &str = "analysis_started";
    pub const ANALYSIS_COMPLETED: &str = "analysis_completed";
    pub const WORKER_COMPLETED: &str = "worker_completed";
    pub const WORKER_FAILED: &str = "worker_failed";
    pub const ORCHESTRATION_COMPLETED: &str = "orchestration_completed";
    pub const MONITORING_STARTED: &str = "monitoring_started";
    pub const MONITORING_HEARTBEAT: &str = "monitoring_heartbeat";
    pub const MONITORING_CANCELLED: &str = "monitoring_cancelled";
    pub const WORKERS_BLOCKED_DETECTED: &str = "workers_blocked_detected";
    pub const ALL_WORKERS_COMPLETED: &str = "all_workers_completed";
    pub const SYNTHESIS_CREATED: &str = "synthesis_created";
    pub const SESSION_COMPLETED: &str = "session_completed";
}

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

impl LogLevel {
    fn mirrors_to_events(self) -> bool {
        matches!(self, LogLevel::Warning | LogLevel::Error)
    }

    fn mirror_event_type(self) -> &'static str {
        match self {
            LogLevel::Warning => "warning_raised",
            _ => "error_raised",
        }
    }
}

/// One normalized record on the event timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub agent: String,
    pub details: Value,
}

/// One diagnostic record on the debug stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub agent: String,
    pub message: String,
    pub details: Value,
}

/// Session-scoped logger used by every component above the substrate.
#[derive(Debug, Clone)]
pub struct EventLogger {
    store: SessionStore,
    session_id: String,
    agent: String,
}

impl EventLogger {
    pub fn new(store: SessionStore, session_id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            agent: agent.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Append a milestone event to EVENTS.jsonl.
    pub fn event(&self, event_type: &str, details: Value) {
        let event = Event {
            timestamp: iso_now(),
            event_type: event_type.to_string(),
            agent: self.agent.clone(),
            details,
        };
        let record = match serde_json::to_value(&event) {
            Ok(record) => record,
            Err(err) => {
                self.report_log_failure("serialize event", &err.to_string());
                return;
            }
        };
        if let Err(err) = self.store.append_event(&self.session_id, record) {
            self.report_log_failure(event_type, &err.to_string());
        }
    }

    /// Append a diagnostic record; WARNING and ERROR are mirrored as events.
    pub fn debug_at(&self, level: LogLevel, message: &str, details: Value) {
        let record = DebugRecord {
            timestamp: iso_now(),
            level,
            agent: self.agent.clone(),
            message: message.to_string(),
            details: details.clone(),
        };
        match serde_json::to_value(&record) {
            Ok(value) => {
                if let Err(err) = self.store.append_debug(&self.session_id, value) {
                    self.report_log_failure(message, &err.to_string());
                }
            }
            Err(err) => self.report_log_failure(message, &err.to_string()),
        }

        if level.mirrors_to_events() {
            self.event(
                level.mirror_event_type(),
                serde_json::json!({
                    "message": message,
                    "details": details,
                }),
            );
        }
    }

    pub fn debug(&self, message: &str, details: Value) {
        self.debug_at(LogLevel::Debug, message, details);
    }

    pub fn info(&self, message: &str, details: Value) {
        self.debug_at(LogLevel::Info, message, details);
    }

    pub fn warning(&self, message: &str, details: Value) {
        self.debug_at(LogLevel::Warning, message, details);
    }

    pub fn error(&self, message: &str, details: Value) {
        self.debug_at(LogLevel::Error, message, details);
    }

    /// Append a deferred-work record to BACKLOG.jsonl.
    pub fn backlog(&self, item: Value) {
        let priority = item
            .get("priority")
            .and_then(Value::as_str)
            .unwrap_or("normal")
            .to_string();
        let record = serde_json::json!({
            "timestamp": iso_now(),
            "created_by": self.agent,
            "item": item,
            "status": "pending",
            "priority": priority,
        });
        if let Err(err) = self.store.append_backlog(&self.session_id, record) {
            self.report_log_failure("backlog", &err.to_string());
        }
    }

    /// Log failures degrade to a stderr debug record; they never propagate.
    fn report_log_failure(&self, context: &str, error: &str) {
        let record = serde_json::json!({
            "timestamp": iso_now(),
            "level": "ERROR",
            "agent": self.agent,
            "message": "session log write failed",
            "details": {"context": context, "error": error},
        });
        eprintln!("{}", record);
    }
}
