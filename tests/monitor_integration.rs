//! End-to-end coordination flow: orchestrate, execute workers, monitor to
//! the readiness gate, synthesize, close.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use hive_forge::monitor::{Monitor, MonitorConfig, MonitorOutcome};
use hive_forge::orchestrator::{DEFAULT_ORCHESTRATOR_MODEL, Orchestrator};
use hive_forge::router::{ModelBackend, ModelRouter};
use hive_forge::session::{SessionStore, read_jsonl};
use hive_forge::worker::{DEFAULT_WORKER_MODEL, WorkerRunner, synthesize};
use hive_forge::HiveError;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct ScriptedBackend {
    responses: Mutex<Vec<Result<String, HiveError>>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String, HiveError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    fn forever(response: &str) -> Self {
        // A single response replayed by cloning before removal
        Self::new(vec![Ok(response.to_string())])
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, _prompt: &str, _model: &str) -> Result<String> {
        let responses = self.responses.lock().unwrap();
        match responses.first() {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(err)) => Err(HiveError::BackendUnavailable(err.to_string()).into()),
            None => Err(HiveError::BackendUnavailable("script exhausted".into()).into()),
        }
    }
}

fn project_store() -> (TempDir, SessionStore) {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
    std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
    let store = SessionStore::new(dir.path().to_path_buf());
    (dir, store)
}

fn fast_monitor(store: &SessionStore, session_id: &str, expected: Vec<String>) -> Monitor {
    Monitor::new(
        store.clone(),
        session_id,
        expected,
        MonitorConfig {
            interval: Duration::from_millis(10),
            stall_multiplier: 3,
        },
    )
}

#[tokio::test]
async fn test_full_session_flow_to_synthesis() {
    let (_dir, store) = project_store();
    let task = "Audit crypto-data service for security";
    let created = store.create_session(task, 3).unwrap();
    let session_id = created.session_id.clone();

    // Orchestrate deterministically (model returns an unusable plan)
    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(ModelRouter::new(Arc::new(ScriptedBackend::forever("nope")))),
    );
    let plan = orchestrator
        .run(&session_id, task, DEFAULT_ORCHESTRATOR_MODEL)
        .await
        .unwrap();
    let expected: Vec<String> = plan
        .worker_assignments
        .iter()
        .map(|a| a.worker_type.as_str().to_string())
        .collect();
    assert!(!expected.is_empty());

    // Execute every assigned worker against a scripted model
    let worker_router = Arc::new(ModelRouter::new(Arc::new(ScriptedBackend::forever(
        r##"{"notes_markdown": "# Notes\nLooked at the service.",
            "summary": {"key_findings": ["ingestion lacks input validation"],
                        "recommendations": ["validate all market payloads"]},
            "findings": [{"description": "unvalidated payload", "severity": "high"}]}"##,
    ))));
    for assignment in &plan.worker_assignments {
        let runner = WorkerRunner::new(
            store.clone(),
            Arc::clone(&worker_router),
            assignment.worker_type,
        );
        runner
            .run(&session_id, &assignment.task_focus, DEFAULT_WORKER_MODEL)
            .await
            .unwrap();
    }

    // Monitor reaches the readiness gate immediately
    let outcome = fast_monitor(&store, &session_id, expected.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, MonitorOutcome::AllCompleted);

    // Synthesis aggregates every worker output and closes the session
    let synthesis = synthesize(&store, &session_id).unwrap();
    assert_eq!(synthesis.sources.len(), expected.len());
    let artifact = std::fs::read_to_string(&synthesis.artifact_path).unwrap();
    assert!(artifact.contains("unvalidated payload"));
    assert!(artifact.contains("validate all market payloads"));

    let state = store.read_state(&session_id).unwrap();
    assert_eq!(state["status"], "completed");
    assert_eq!(state["coordination_status"]["synthesis_ready"], true);

    let events = read_jsonl(&created.path.join("EVENTS.jsonl")).unwrap();
    let count = |t: &str| events.iter().filter(|e| e["type"] == t).count();
    assert_eq!(count("all_workers_completed"), 1);
    assert_eq!(count("synthesis_created"), 1);
    assert_eq!(count("session_completed"), 1);
}

// ============================================================================
// Property 7: monitor idempotence
// ============================================================================

#[tokio::test]
async fn test_monitor_verdict_is_idempotent() {
    let (_dir, store) = project_store();
    let created = store.create_session("Monitor idempotence session", 2).unwrap();
    let session_id = created.session_id.clone();

    store
        .update_state(
            &session_id,
            serde_json::json!({
                "coordination_status": {"workers_completed": ["analyzer-worker"]}
            }),
        )
        .unwrap();
    let expected = vec!["analyzer-worker".to_string()];

    let first = fast_monitor(&store, &session_id, expected.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();
    let second = fast_monitor(&store, &session_id, expected)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first, second);

    let events = read_jsonl(&created.path.join("EVENTS.jsonl")).unwrap();
    assert_eq!(
        events
            .iter()
            .filter(|e| e["type"] == "all_workers_completed")
            .count(),
        1,
        "completion signal is emitted at most once per session"
    );
    // Heartbeat-family events stay additive across runs
    assert_eq!(
        events
            .iter()
            .filter(|e| e["type"] == "monitoring_started")
            .count(),
        2
    );
}

// ============================================================================
// Scenario S5: worker against a missing session
// ============================================================================

#[tokio::test]
async fn test_worker_with_missing_session_writes_no_files() {
    let (dir, store) = project_store();

    let runner = WorkerRunner::new(
        store.clone(),
        Arc::new(ModelRouter::new(Arc::new(ScriptedBackend::forever("{}")))),
        hive_forge::WorkerType::Analyzer,
    );
    let err = runner
        .run(
            "2025-01-01-00-00-session-that-never-was",
            "task",
            DEFAULT_WORKER_MODEL,
        )
        .await
        .unwrap_err();
    assert_eq!(hive_forge::errors::error_kind(&err), "session_not_found");

    // Nothing was created anywhere under the sessions tree
    let sessions_dir = dir.path().join("Docs/hive-mind/sessions");
    let entries = std::fs::read_dir(&sessions_dir)
        .map(|iter| iter.count())
        .unwrap_or(0);
    assert_eq!(entries, 0);
}
