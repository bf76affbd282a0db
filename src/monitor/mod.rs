//! Cooperative monitor loop: progress tracking, stall detection, and the
//! readiness gate for synthesis.
//!
//! The loop is single-threaded and read-only over STATE.json; it writes only
//! to the event and backlog streams. It never kills workers - escalation is
//! a backlog record plus a `workers_blocked_detected` event.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::HiveError;
use crate::session::{
    EventLogger, SessionStore, WorkerStatus, event_types, read_jsonl,
};

/// Default seconds between monitor iterations.
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;

/// Default stall threshold as a multiple of the monitor interval.
pub const DEFAULT_STALL_MULTIPLIER: u32 = 3;

/// Monitor loop configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Stall threshold = interval * stall_multiplier
    pub stall_multiplier: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            stall_multiplier: DEFAULT_STALL_MULTIPLIER,
        }
    }
}

/// Final verdict of one monitor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every expected worker reported completion
    AllCompleted,
    /// The loop was cancelled before completion
    Cancelled,
}

/// Result of a single observation tick.
#[derive(Debug)]
enum Tick {
    AllCompleted,
    Pending,
}

/// Mutable observation state carried across iterations.
struct ProgressTracker {
    previously_blocked: BTreeSet<String>,
    last_change: Instant,
    last_completed_count: usize,
    stall_reported: bool,
}

impl ProgressTracker {
    fn new() -> Self {
        Self {
            previously_blocked: BTreeSet::new(),
            last_change: Instant::now(),
            last_completed_count: 0,
            stall_reported: false,
        }
    }
}

/// The monitor for one session's worker fan-out.
pub struct Monitor {
    store: SessionStore,
    session_id: String,
    expected: BTreeSet<String>,
    config: MonitorConfig,
    logger: EventLogger,
}

impl Monitor {
    pub fn new(
        store: SessionStore,
        session_id: impl Into<String>,
        expected_workers: Vec<String>,
        config: MonitorConfig,
    ) -> Self {
        let session_id = session_id.into();
        let logger = EventLogger::new(store.clone(), session_id.clone(), "queen-orchestrator");
        Self {
            store,
            session_id,
            expected: expected_workers.into_iter().collect(),
            config,
            logger,
        }
    }

    /// Run until every expected worker completes or the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MonitorOutcome> {
        self.store.ensure_session_exists(&self.session_id)?;

        self.logger.event(
            event_types::MONITORING_STARTED,
            json!({
                "workers_to_monitor": self.expected.iter().collect::<Vec<_>>(),
                "interval_seconds": self.config.interval.as_secs(),
            }),
        );

        let mut tracker = ProgressTracker::new();

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            match self.tick(&mut tracker) {
                Ok(Tick::AllCompleted) => {
                    info!(session = %self.session_id, "all workers completed");
                    return Ok(MonitorOutcome::AllCompleted);
                }
                Ok(Tick::Pending) => {}
                Err(err) => {
                    // Observation failures never end monitoring
                    self.logger.debug(
                        "monitoring observation failed",
                        json!({"error": err.to_string(), "action": "continuing_monitoring"}),
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = cancel.cancelled() => return Ok(self.cancelled()),
            }
        }
    }

    fn cancelled(&self) -> MonitorOutcome {
        self.logger.event(
            event_types::MONITORING_CANCELLED,
            json!({"reason": "cancellation requested"}),
        );
        MonitorOutcome::Cancelled
    }

    /// One read-only observation of session state.
    fn tick(&self, tracker: &mut ProgressTracker) -> Result<Tick> {
        let state = self.store.read_state_typed(&self.session_id)?;

        let completed: BTreeSet<String> = state
            .coordination_status
            .workers_completed
            .iter()
            .filter(|worker| self.expected.contains(*worker))
            .cloned()
            .collect();

        if completed.len() != tracker.last_completed_count {
            tracker.last_completed_count = completed.len();
            tracker.last_change = Instant::now();
            tracker.stall_reported = false;
        }

        if !self.expected.is_empty() && completed.len() == self.expected.len() {
            self.signal_all_completed(&completed)?;
            return Ok(Tick::AllCompleted);
        }

        let pending: Vec<String> = self
            .expected
            .iter()
            .filter(|worker| !completed.contains(*worker))
            .cloned()
            .collect();

        let blocked: BTreeSet<String> = pending
            .iter()
            .filter(|worker| {
                state
                    .worker_configs
                    .get(*worker)
                    .is_some_and(|slot| slot.status == WorkerStatus::Blocked)
            })
            .cloned()
            .collect();

        // Report only newly blocked workers, deduplicated against the
        // previous iteration.
        let newly_blocked: Vec<&String> =
            blocked.difference(&tracker.previously_blocked).collect();
        if !newly_blocked.is_empty() {
            self.logger.event(
                event_types::WORKERS_BLOCKED_DETECTED,
                json!({
                    "blocked_workers": newly_blocked,
                    "action": "escalation_required",
                }),
            );
        }
        tracker.previously_blocked = blocked.clone();

        let stall_threshold = self.config.interval * self.config.stall_multiplier;
        let stalled = tracker.last_change.elapsed() >= stall_threshold;
        if stalled && !tracker.stall_reported {
            tracker.stall_reported = true;
            self.report_stall(&state, &pending);
        }

        let mut heartbeat = json!({
            "completed": completed.iter().collect::<Vec<_>>(),
            "pending": pending,
            "blocked": blocked.iter().collect::<Vec<_>>(),
            "progress": format!("{}/{}", completed.len(), self.expected.len()),
        });
        if stalled {
            heartbeat["stalled"] = json!(true);
            heartbeat["stalled_workers"] = json!(pending);
        }
        self.logger.event(event_types::MONITORING_HEARTBEAT, heartbeat);

        Ok(Tick::Pending)
    }

    /// Emit `all_workers_completed` at most once per session: existing
    /// occurrences on the event stream (from any run) suppress re-emission.
    fn signal_all_completed(&self, completed: &BTreeSet<String>) -> Result<()> {
        let events_path = self
            .store
            .session_path(&self.session_id)
            .join("EVENTS.jsonl");
        let already_signalled = read_jsonl(&events_path)?
            .iter()
            .any(|event| event["type"] == event_types::ALL_WORKERS_COMPLETED);

        if !already_signalled {
            self.logger.event(
                event_types::ALL_WORKERS_COMPLETED,
                json!({
                    "completed_workers": completed.iter().collect::<Vec<_>>(),
                    "monitoring_duration": "continuous",
                }),
            );
        }
        Ok(())
    }

    /// Stall escalation: one blocked event plus a backlog record naming the
    /// stalled workers and their unmet dependencies.
    fn report_stall(&self, state: &crate::session::SessionState, pending: &[String]) {
        self.logger.event(
            event_types::WORKERS_BLOCKED_DETECTED,
            json!({
                "blocked_workers": pending,
                "action": "escalation_required",
                "reason": "stall_threshold_exceeded",
            }),
        );

        let completed: BTreeSet<&String> =
            state.coordination_status.workers_completed.iter().collect();
        let mut unmet: Vec<String> = Vec::new();
        for worker in pending {
            if let Some(slot) = state.worker_configs.get(worker) {
                for dependency in &slot.dependencies {
                    if !completed.contains(dependency) {
                        unmet.push(
                            HiveError::DependencyStillPending {
                                worker_type: worker.clone(),
                                dependency: dependency.clone(),
                            }
                            .to_string(),
                        );
                    }
                }
            }
        }

        self.logger.backlog(json!({
            "reason": "workers_stalled",
            "stalled_workers": pending,
            "unmet_dependencies": unmet,
            "priority": "high",
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup(expected: &[&str]) -> (tempfile::TempDir, SessionStore, Monitor, String) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let created = store.create_session("Monitor loop test session", 2).unwrap();

        let monitor = Monitor::new(
            store.clone(),
            created.session_id.clone(),
            expected.iter().map(|w| w.to_string()).collect(),
            MonitorConfig {
                interval: Duration::from_millis(10),
                stall_multiplier: 3,
            },
        );
        (dir, store, monitor, created.session_id)
    }

    fn mark_completed(store: &SessionStore, session_id: &str, workers: &[&str]) {
        store
            .update_state(
                session_id,
                json!({"coordination_status": {"workers_completed": workers}}),
            )
            .unwrap();
    }

    fn events(store: &SessionStore, session_id: &str) -> Vec<serde_json::Value> {
        read_jsonl(&store.session_path(session_id).join("EVENTS.jsonl")).unwrap()
    }

    #[tokio::test]
    async fn test_completes_when_all_workers_done() {
        let (_dir, store, monitor, session_id) = setup(&["analyzer-worker", "backend-worker"]);
        mark_completed(&store, &session_id, &["analyzer-worker", "backend-worker"]);

        let outcome = monitor.run(CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, MonitorOutcome::AllCompleted);

        let all = events(&store, &session_id);
        assert_eq!(
            all.iter()
                .filter(|e| e["type"] == "all_workers_completed")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_completion_event_emitted_at_most_once_per_session() {
        let (_dir, store, monitor, session_id) = setup(&["analyzer-worker"]);
        mark_completed(&store, &session_id, &["analyzer-worker"]);

        let first = monitor.run(CancellationToken::new()).await.unwrap();
        let second = monitor.run(CancellationToken::new()).await.unwrap();
        assert_eq!(first, MonitorOutcome::AllCompleted);
        assert_eq!(second, MonitorOutcome::AllCompleted);

        let all = events(&store, &session_id);
        assert_eq!(
            all.iter()
                .filter(|e| e["type"] == "all_workers_completed")
                .count(),
            1,
            "completion is signalled at most once per session"
        );
        // Heartbeats stay additive: both runs logged monitoring_started
        assert_eq!(
            all.iter()
                .filter(|e| e["type"] == "monitoring_started")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_cancellation_emits_final_event() {
        let (_dir, store, monitor, session_id) = setup(&["analyzer-worker"]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = monitor.run(cancel).await.unwrap();
        assert_eq!(outcome, MonitorOutcome::Cancelled);

        let all = events(&store, &session_id);
        assert!(all.iter().any(|e| e["type"] == "monitoring_cancelled"));
        assert!(all.iter().all(|e| e["type"] != "all_workers_completed"));
    }

    #[tokio::test]
    async fn test_blocked_detection_deduplicates() {
        let (_dir, store, monitor, session_id) = setup(&["analyzer-worker", "backend-worker"]);
        store
            .update_state(
                &session_id,
                json!({
                    "coordination_status": {"workers_pending": ["analyzer-worker", "backend-worker"]},
                    "worker_configs": {
                        "analyzer-worker": {"status": "blocked"},
                        "backend-worker": {"status": "running"},
                    }
                }),
            )
            .unwrap();

        let mut tracker = ProgressTracker::new();
        monitor.tick(&mut tracker).unwrap();
        monitor.tick(&mut tracker).unwrap();

        let all = events(&store, &session_id);
        let blocked_events: Vec<_> = all
            .iter()
            .filter(|e| e["type"] == "workers_blocked_detected")
            .collect();
        assert_eq!(blocked_events.len(), 1, "repeat observations are deduplicated");
        assert_eq!(
            blocked_events[0]["details"]["blocked_workers"],
            json!(["analyzer-worker"])
        );

        // Heartbeats are emitted every tick
        assert_eq!(
            all.iter()
                .filter(|e| e["type"] == "monitoring_heartbeat")
                .count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_annotates_heartbeat_and_writes_backlog() {
        let (_dir, store, monitor, session_id) = setup(&["frontend-worker"]);
        store
            .update_state(
                &session_id,
                json!({
                    "coordination_status": {"workers_pending": ["frontend-worker"]},
                    "worker_configs": {
                        "frontend-worker": {
                            "status": "running",
                            "dependencies": ["backend-worker"],
                        },
                    }
                }),
            )
            .unwrap();

        let mut tracker = ProgressTracker::new();
        monitor.tick(&mut tracker).unwrap();

        // Cross the stall threshold (3 * 10ms)
        tokio::time::advance(Duration::from_millis(50)).await;
        monitor.tick(&mut tracker).unwrap();

        let all = events(&store, &session_id);
        let stalled_heartbeat = all
            .iter()
            .filter(|e| e["type"] == "monitoring_heartbeat")
            .find(|e| e["details"]["stalled"] == json!(true))
            .expect("a stalled heartbeat");
        assert_eq!(
            stalled_heartbeat["details"]["stalled_workers"],
            json!(["frontend-worker"])
        );

        let backlog = read_jsonl(&store.session_path(&session_id).join("BACKLOG.jsonl")).unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0]["item"]["reason"], "workers_stalled");
        let unmet = backlog[0]["item"]["unmet_dependencies"][0].as_str().unwrap();
        assert!(unmet.contains("frontend-worker"));
        assert!(unmet.contains("backend-worker"));
    }
}
