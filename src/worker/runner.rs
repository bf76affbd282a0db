//! Generic worker execution envelope.
//!
//! Every concrete worker is this envelope instantiated with a different
//! profile: read prompt, invoke the model router, validate the typed result,
//! emit notes + JSON, patch session state. Cross-worker communication happens
//! only through the session filesystem.
//!
//! Workers never retry model calls; retry policy is a plan-level concern that
//! lives in the orchestrator.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::errors::{HiveError, error_kind};
use crate::models::WorkerType;
use crate::router::{ModelMessage, ModelRouter, STRUCTURED_RESULT_TOOL};
use crate::session::paths::{notes_path, output_path, prompt_path};
use crate::session::{EventLogger, SessionStore, event_types, iso_now};

use super::outputs::{WorkerReport, report_from_value};
use super::profiles::{self, WorkerProfile};
use super::prompt_data::TaskContext;

/// Default logical model for worker invocations.
pub const DEFAULT_WORKER_MODEL: &str = "custom:max-subscription";

/// A worker runner bound to one worker type within one session store.
pub struct WorkerRunner {
    store: SessionStore,
    router: Arc<ModelRouter>,
    profile: &'static WorkerProfile,
}

impl WorkerRunner {
    pub fn new(store: SessionStore, router: Arc<ModelRouter>, worker_type: WorkerType) -> Self {
        Self {
            store,
            router,
            profile: profiles::profile(worker_type),
        }
    }

    pub fn profile(&self) -> &'static WorkerProfile {
        self.profile
    }

    fn logger(&self, session_id: &str) -> EventLogger {
        EventLogger::new(
            self.store.clone(),
            session_id,
            self.profile.worker_type.as_str(),
        )
    }

    /// Execute one worker invocation end to end.
    ///
    /// On failure at any step this logs `worker_failed` with the error kind
    /// and message, marks the worker failed in session state, and propagates.
    pub async fn run(&self, session_id: &str, task_focus: &str, model: &str) -> Result<WorkerReport> {
        match self.run_inner(session_id, task_focus, model).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.record_failure(session_id, &err);
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        session_id: &str,
        task_focus: &str,
        model: &str,
    ) -> Result<WorkerReport> {
        let worker_type = self.profile.worker_type.as_str();

        // Session must already exist in full; a worker never creates it.
        self.store.ensure_session_exists(session_id)?;
        let logger = self.logger(session_id);

        logger.event(
            event_types::WORKER_SPAWNED,
            json!({
                "worker_type": worker_type,
                "task_description": task_focus,
                "capabilities": self.profile.focus_areas,
            }),
        );

        // A missing prompt file is a protocol violation, never a silent
        // fallback: the orchestrator is contractually required to have
        // materialized it before spawn.
        let prompt_file = prompt_path(&self.store.session_path(session_id), worker_type);
        let prompt = std::fs::read_to_string(&prompt_file).map_err(|_| {
            HiveError::ProtocolViolation(format!(
                "prompt file missing for {}: {}",
                worker_type,
                prompt_file.display()
            ))
        })?;
        logger.event(
            event_types::PROMPT_FILE_READ,
            json!({"path": format!("workers/prompts/{}.prompt", worker_type)}),
        );

        // Coordination context embedded in the prompt frontmatter
        let context = TaskContext::parse(&prompt);
        logger.debug(
            "prompt context loaded",
            json!({
                "focus_areas": context.focus_areas,
                "complexity_level": context.complexity_level,
                "priority": context.priority,
                "dependencies": context.dependencies,
            }),
        );

        self.mark_running(session_id, task_focus)?;

        logger.event(
            event_types::ANALYSIS_STARTED,
            json!({
                "worker_type": worker_type,
                "task_description": task_focus,
                "model": model,
            }),
        );

        let messages = [
            ModelMessage::system(prompt),
            ModelMessage::user(format!("Execute your assigned task: {}", task_focus)),
        ];
        let response = self.router.complete_structured(model, &messages).await?;

        let arguments = response
            .tool_call_arguments(STRUCTURED_RESULT_TOOL)
            .ok_or_else(|| {
                HiveError::Validation(format!(
                    "{} returned unstructured text instead of a typed result",
                    worker_type
                ))
            })?;
        let mut report = report_from_value(arguments)?;
        report.enrich(self.profile, session_id, task_focus);
        if let Some(config) = report.base.config.as_mut() {
            config.dependencies = context.dependencies.clone();
            config.priority = context.priority;
            config.complexity_level = context.complexity_level;
        }

        self.emit_output_files(session_id, &report, &logger)?;

        self.mark_completed(session_id, &report)?;

        logger.event(event_types::ANALYSIS_COMPLETED, report.completion_details());
        logger.event(event_types::WORKER_COMPLETED, report.completion_details());
        info!(worker = worker_type, session = session_id, "worker completed");

        Ok(report)
    }

    /// Write the notes markdown and the full structured JSON.
    ///
    /// A worker owns its output paths exclusively, so plain (non-append)
    /// creation is used and an existing file is overwritten.
    pub(crate) fn emit_output_files(
        &self,
        session_id: &str,
        report: &WorkerReport,
        logger: &EventLogger,
    ) -> Result<()> {
        let session_path = self.store.session_path(session_id);

        if !report.base.notes_markdown.is_empty() {
            let notes_file = notes_path(&session_path, self.profile.file_prefix);
            std::fs::write(&notes_file, &report.base.notes_markdown)
                .with_context(|| format!("Failed to write {}", notes_file.display()))?;
            logger.debug(
                "notes file written",
                json!({"path": format!("workers/notes/{}_notes.md", self.profile.file_prefix)}),
            );
        }

        let output_file = output_path(&session_path, self.profile.file_prefix);
        std::fs::write(&output_file, serde_json::to_string_pretty(report)?)
            .with_context(|| format!("Failed to write {}", output_file.display()))?;
        logger.debug(
            "output JSON written",
            json!({"path": format!("workers/json/{}_output.json", self.profile.file_prefix)}),
        );

        Ok(())
    }

    fn mark_running(&self, session_id: &str, task_focus: &str) -> Result<()> {
        let worker_type = self.profile.worker_type.as_str();
        self.store.update_state(
            session_id,
            json!({
                "worker_configs": {
                    worker_type: {
                        "status": "running",
                        "started_at": iso_now(),
                        "task_description": task_focus,
                        "tag_access": self.profile.worker_type.tag_access(),
                    }
                }
            }),
        )?;
        Ok(())
    }

    fn mark_completed(&self, session_id: &str, report: &WorkerReport) -> Result<()> {
        let worker_type = self.profile.worker_type.as_str();
        let state = self.store.read_state_typed(session_id)?;

        let mut completed = state.coordination_status.workers_completed.clone();
        if !completed.iter().any(|w| w == worker_type) {
            completed.push(worker_type.to_string());
        }
        let pending: Vec<String> = state
            .coordination_status
            .workers_pending
            .iter()
            .filter(|w| w.as_str() != worker_type)
            .cloned()
            .collect();
        let spawned: Vec<String> = state
            .coordination_status
            .workers_spawned
            .iter()
            .filter(|w| w.as_str() != worker_type)
            .cloned()
            .collect();

        let workers_total = state.metrics.workers_total.max(
            (completed.len() + pending.len()) as u64,
        );
        let completion_percentage = if workers_total > 0 {
            completed.len() as f64 / workers_total as f64 * 100.0
        } else {
            0.0
        };

        self.store.update_state(
            session_id,
            json!({
                "coordination_status": {
                    "workers_completed": completed,
                    "workers_pending": pending,
                    "workers_spawned": spawned,
                },
                "worker_configs": {
                    worker_type: {
                        "status": "completed",
                        "completed_at": iso_now(),
                        "scores": report.scores,
                    }
                },
                "metrics": {
                    "completion_percentage": completion_percentage,
                }
            }),
        )?;
        Ok(())
    }

    /// Record a failed invocation: `worker_failed` event plus state patch.
    ///
    /// Also used by the CLI's interrupt path, which must write the event
    /// before exiting.
    pub fn record_failure(&self, session_id: &str, err: &anyhow::Error) {
        let worker_type = self.profile.worker_type.as_str();
        let logger = self.logger(session_id);

        logger.event(
            event_types::WORKER_FAILED,
            json!({
                "worker_type": worker_type,
                "error_kind": error_kind(err),
                "error": err.to_string(),
            }),
        );
        logger.error(
            "worker invocation failed",
            json!({"error": err.to_string(), "worker_type": worker_type}),
        );

        let mut failed_patch = json!({
            "worker_configs": {
                worker_type: {"status": "failed"}
            }
        });
        if let Ok(state) = self.store.read_state_typed(session_id) {
            let mut failed = state.coordination_status.workers_failed.clone();
            if !failed.iter().any(|w| w == worker_type) {
                failed.push(worker_type.to_string());
            }
            failed_patch["coordination_status"] = json!({"workers_failed": failed});
        }
        let _ = self.store.update_state(session_id, failed_patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrchestrationPlan;
    use crate::models::{Priority, WorkerAssignment};
    use crate::prompts::PromptGenerator;
    use crate::router::ModelBackend;
    use tempfile::tempdir;

    struct ScriptedBackend {
        response: String,
    }

    #[async_trait::async_trait]
    impl ModelBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &str, _model: &str) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    fn router_with(response: &str) -> Arc<ModelRouter> {
        Arc::new(ModelRouter::new(Arc::new(ScriptedBackend {
            response: response.to_string(),
        })))
    }

    fn session_with_prompt(worker_type: WorkerType) -> (tempfile::TempDir, SessionStore, String) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let created = store.create_session("Worker runner test session", 2).unwrap();

        let plan = OrchestrationPlan {
            complexity_assessment: 2,
            worker_assignments: vec![WorkerAssignment {
                worker_type,
                priority: Priority::Medium,
                task_focus: "Analyze the session".to_string(),
                dependencies: vec![],
                estimated_duration: "1h".to_string(),
                strategic_value: Priority::Medium,
                rationale: "test".to_string(),
            }],
            ..OrchestrationPlan::default()
        };
        PromptGenerator::new(store.clone(), &created.session_id)
            .generate_for_plan(&plan)
            .unwrap();

        (dir, store, created.session_id)
    }

    #[tokio::test]
    async fn test_successful_run_emits_files_and_events() {
        let (_dir, store, session_id) = session_with_prompt(WorkerType::Analyzer);
        let router = router_with(
            r##"{"notes_markdown": "# Findings\n", "findings": [{"description": "weak hash", "severity": "high"}], "scores": {"security_score": 7.5}}"##,
        );

        let runner = WorkerRunner::new(store.clone(), router, WorkerType::Analyzer);
        let report = runner
            .run(&session_id, "Audit auth", DEFAULT_WORKER_MODEL)
            .await
            .unwrap();

        assert_eq!(report.base.worker, "analyzer-worker");
        assert_eq!(report.findings.len(), 1);

        let session_path = store.session_path(&session_id);
        assert!(session_path.join("workers/json/analyzer_output.json").is_file());
        assert!(session_path.join("workers/notes/analyzer_notes.md").is_file());

        let events = crate::session::read_jsonl(&session_path.join("EVENTS.jsonl")).unwrap();
        let types: Vec<&str> = events
            .iter()
            .filter_map(|e| e["type"].as_str())
            .collect();
        for expected in [
            "worker_spawned",
            "prompt_file_read",
            "analysis_started",
            "analysis_completed",
            "worker_completed",
        ] {
            assert!(types.contains(&expected), "missing event {}", expected);
        }

        let state = store.read_state_typed(&session_id).unwrap();
        let slot = &state.worker_configs["analyzer-worker"];
        assert_eq!(slot.scores["security_score"], 7.5);
        assert!(state
            .coordination_status
            .workers_completed
            .contains(&"analyzer-worker".to_string()));
    }

    #[tokio::test]
    async fn test_missing_session_is_fatal_and_writes_nothing() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        let runner = WorkerRunner::new(store.clone(), router_with("{}"), WorkerType::Analyzer);
        let err = runner
            .run("2025-01-01-00-00-missing-session-dir", "task", DEFAULT_WORKER_MODEL)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("missing"));
        assert!(!store
            .session_path("2025-01-01-00-00-missing-session-dir")
            .exists());
    }

    #[tokio::test]
    async fn test_missing_prompt_is_protocol_violation() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let created = store.create_session("No prompt file session", 2).unwrap();

        let runner = WorkerRunner::new(store.clone(), router_with("{}"), WorkerType::Backend);
        let err = runner
            .run(&created.session_id, "task", DEFAULT_WORKER_MODEL)
            .await
            .unwrap_err();

        assert_eq!(error_kind(&err), "protocol_violation");

        // Failure is visible in both streams and the state document
        let events =
            crate::session::read_jsonl(&created.path.join("EVENTS.jsonl")).unwrap();
        assert!(events.iter().any(|e| e["type"] == "worker_failed"));
        let state = store.read_state_typed(&created.session_id).unwrap();
        assert!(state
            .coordination_status
            .workers_failed
            .contains(&"backend-worker".to_string()));
    }

    #[tokio::test]
    async fn test_unstructured_response_fails_validation() {
        let (_dir, store, session_id) = session_with_prompt(WorkerType::Analyzer);
        let router = router_with("I analyzed everything and it looks fine.");

        let runner = WorkerRunner::new(store.clone(), router, WorkerType::Analyzer);
        let err = runner
            .run(&session_id, "Audit auth", DEFAULT_WORKER_MODEL)
            .await
            .unwrap_err();

        assert_eq!(error_kind(&err), "validation_error");
        assert!(!store
            .session_path(&session_id)
            .join("workers/json/analyzer_output.json")
            .exists());
    }
}
