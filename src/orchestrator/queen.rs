//! The queen orchestrator: strategic task analysis, worker selection, prompt
//! materialization, and spawn preparation.
//!
//! The queen never executes workers itself; it prepares dispatch descriptors
//! and the host runtime performs the actual spawning.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

use crate::errors::HiveError;
use crate::models::{OrchestrationPlan, PlanStatus, TaskDispatch};
use crate::prompts::PromptGenerator;
use crate::router::{ModelMessage, ModelRouter, STRUCTURED_RESULT_TOOL};
use crate::session::paths::prompt_path;
use crate::session::{COORDINATOR, EventLogger, SessionStore, event_types, iso_now, summary};

use super::selection::fallback_plan;

/// Default logical model for orchestration.
pub const DEFAULT_ORCHESTRATOR_MODEL: &str = "openai:gpt-4o";

/// Retries after the initial attempt; four attempts total.
const MAX_RETRIES: u32 = 3;

/// Premium-tier markers that downgrade to the mid-tier default when the
/// backend reports the model as unavailable.
const PREMIUM_MODEL_HINTS: [&str; 4] = ["opus", "o3", "o1", "gpt-5"];

/// Mid-tier logical model used as the downgrade target.
const MID_TIER_MODEL: &str = "openai:gpt-4o";

const SYSTEM_PROMPT: &str = r#"You are the queen orchestrator, the strategic coordinator of a hive of specialist workers.

Analyze the task and return ONLY a JSON object with these fields:
- task_summary: your understanding of the task
- complexity_assessment: integer 1-4 (technical complexity)
- coordination_complexity: integer 1-5 (coordination difficulty, independent of technical complexity)
- orchestration_rationale: why these workers were selected
- estimated_total_duration: e.g. "2-4h"
- worker_assignments: list of {worker_type, priority, task_focus, dependencies, estimated_duration, strategic_value, rationale}
- execution_strategy: "parallel" | "sequential" | "hybrid"
- coordination_notes: list of strings
- success_criteria: list of strings
- codebase_insights: optional list of {service_name, key_files, service_description, technology_stack, interaction_points} - factual only, never opinion

Available worker types: analyzer-worker (security/performance/quality), architect-worker (system design), backend-worker (API/services/database), frontend-worker (UI/components), designer-worker (UX/accessibility), devops-worker (infrastructure/deployment), researcher-worker (standards/best practices), test-worker (testing strategy/coverage).

Choose the smallest worker set that covers the task's real risk surface; a simple task may need one worker, a comprehensive audit needs architecture, quality, implementation, and validation coverage. Dependencies may only reference worker types present in worker_assignments and must stay acyclic."#;

/// The strategic decision-making agent.
pub struct Orchestrator {
    store: SessionStore,
    router: Arc<ModelRouter>,
}

impl Orchestrator {
    pub fn new(store: SessionStore, router: Arc<ModelRouter>) -> Self {
        Self { store, router }
    }

    fn logger(&self, session_id: &str) -> EventLogger {
        EventLogger::new(self.store.clone(), session_id, COORDINATOR)
    }

    /// Run orchestration end to end: analyze, plan, persist state, generate
    /// prompts, and prepare dispatch descriptors.
    pub async fn run(
        &self,
        session_id: &str,
        task: &str,
        model: &str,
    ) -> Result<OrchestrationPlan> {
        self.store.ensure_session_exists(session_id)?;
        let logger = self.logger(session_id);

        logger.event(
            event_types::QUEEN_SPAWNED,
            json!({
                "note": "Queen orchestrator initialized for session",
                "model": model,
            }),
        );

        let mut plan = self.orchestrate_with_retry(session_id, task, model).await?;

        // Ensure envelope identity regardless of what the model produced
        plan.session_id = session_id.to_string();
        if plan.timestamp.is_empty() {
            plan.timestamp = iso_now();
        }
        plan.status = PlanStatus::Completed;
        plan.session_path = self.store.session_path(session_id).display().to_string();

        self.apply_state_update(session_id, task, &plan)?;

        logger.event(
            event_types::TASKS_ASSIGNED,
            json!({
                "worker_assignments": plan
                    .worker_assignments
                    .iter()
                    .map(|a| json!({
                        "worker_type": a.worker_type,
                        "task_focus": a.task_focus,
                        "priority": a.priority,
                        "dependencies": a.dependencies,
                        "estimated_duration": a.estimated_duration,
                        "rationale": a.rationale,
                    }))
                    .collect::<Vec<_>>(),
                "total_workers": plan.worker_assignments.len(),
                "complexity_level": plan.complexity_assessment,
                "execution_strategy": plan.execution_strategy,
            }),
        );

        // Prompt files must exist before any worker is spawned
        PromptGenerator::new(self.store.clone(), session_id).generate_for_plan(&plan)?;

        plan.task_execution_plan = self.build_dispatches(session_id, &plan);
        plan.workers_spawned = plan
            .worker_assignments
            .iter()
            .map(|a| a.worker_type.as_str().to_string())
            .collect();

        logger.event(
            event_types::ORCHESTRATION_COMPLETED,
            json!({
                "complexity": plan.complexity_assessment,
                "worker_count": plan.worker_assignments.len(),
                "strategy": plan.execution_strategy,
            }),
        );

        // SESSION.md is derived; a rewrite failure is never fatal
        if let Err(err) = summary::write_orchestration_summary(&self.store, session_id, task, &plan)
        {
            logger.warning("SESSION.md update failed", json!({"error": err.to_string()}));
        }

        info!(
            session = session_id,
            workers = plan.worker_assignments.len(),
            "orchestration completed"
        );
        Ok(plan)
    }

    /// Model invocation with bounded retry.
    ///
    /// Backend-unavailable errors are retried up to three times: rate limits
    /// sleep `(attempt + 1) * 2` seconds, unavailable premium models are
    /// downgraded to the mid-tier default, and other backend failures back
    /// off exponentially. Exhaustion propagates the final error.
    async fn orchestrate_with_retry(
        &self,
        session_id: &str,
        task: &str,
        model: &str,
    ) -> Result<OrchestrationPlan> {
        let logger = self.logger(session_id);
        let mut current_model = model.to_string();
        let mut attempt: u32 = 0;

        loop {
            match self.attempt_plan(session_id, task, &current_model).await {
                Ok(plan) => return Ok(plan),
                Err(err) => {
                    let retryable = err
                        .downcast_ref::<HiveError>()
                        .is_some_and(HiveError::is_backend_unavailable);

                    if !retryable || attempt >= MAX_RETRIES {
                        logger.error(
                            "orchestration failed after retries",
                            json!({
                                "error": err.to_string(),
                                "attempts": attempt + 1,
                                "model": current_model,
                            }),
                        );
                        return Err(err);
                    }

                    logger.debug(
                        "orchestration attempt failed",
                        json!({
                            "error": err.to_string(),
                            "retry_count": attempt,
                            "original_model": current_model,
                        }),
                    );

                    match err.downcast_ref::<HiveError>() {
                        Some(HiveError::RateLimited { .. }) => {
                            let wait_secs = u64::from(attempt + 1) * 2;
                            logger.debug(
                                "rate limit hit, backing off",
                                json!({"wait_time": wait_secs}),
                            );
                            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        }
                        Some(HiveError::BackendUnavailable(message))
                            if message.contains("model_not_found")
                                || message.contains("does not exist") =>
                        {
                            if PREMIUM_MODEL_HINTS
                                .iter()
                                .any(|hint| current_model.contains(hint))
                            {
                                logger.debug(
                                    "switching to available model",
                                    json!({"new_model": MID_TIER_MODEL}),
                                );
                                current_model = MID_TIER_MODEL.to_string();
                            }
                        }
                        _ => {
                            let wait_secs = 2u64.saturating_pow(attempt).min(8);
                            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        }
                    }

                    attempt += 1;
                }
            }
        }
    }

    /// One model attempt. Structurally invalid plan JSON never errors; it
    /// degrades to the deterministic keyword fallback.
    async fn attempt_plan(
        &self,
        session_id: &str,
        task: &str,
        model: &str,
    ) -> Result<OrchestrationPlan> {
        let logger = self.logger(session_id);
        let messages = [
            ModelMessage::system(SYSTEM_PROMPT),
            ModelMessage::user(format!("Orchestrate this task: {}", task)),
        ];
        let response = self.router.complete_structured(model, &messages).await?;

        let plan = response
            .tool_call_arguments(STRUCTURED_RESULT_TOOL)
            .and_then(|arguments| {
                serde_json::from_value::<OrchestrationPlan>(arguments.clone()).ok()
            })
            .filter(|plan| !plan.worker_assignments.is_empty() && plan.validate().is_ok());

        match plan {
            Some(plan) => Ok(plan),
            None => {
                warn!(session = session_id, "model plan invalid, using fallback");
                logger.warning(
                    "model returned structurally invalid plan, synthesizing fallback",
                    json!({"model": model}),
                );
                Ok(fallback_plan(session_id, task))
            }
        }
    }

    /// Comprehensive state update: coordination phase, pending worker list,
    /// and per-worker configuration slots.
    fn apply_state_update(
        &self,
        session_id: &str,
        task: &str,
        plan: &OrchestrationPlan,
    ) -> Result<()> {
        let worker_types: Vec<String> = plan
            .worker_assignments
            .iter()
            .map(|a| a.worker_type.as_str().to_string())
            .collect();

        let target_service = plan
            .codebase_insights
            .first()
            .map(|insight| insight.service_name.clone())
            .or_else(|| {
                super::assessment::assess_task(task)
                    .service_scope
                    .first()
                    .cloned()
            })
            .unwrap_or_else(|| "unknown".to_string());

        let mut worker_configs = serde_json::Map::new();
        for assignment in &plan.worker_assignments {
            worker_configs.insert(
                assignment.worker_type.as_str().to_string(),
                json!({
                    "tag_access": assignment.worker_type.tag_access(),
                    "escalation_timeout": 300,
                    "escalation_chain": [COORDINATOR],
                    "complexity_level": plan.complexity_assessment,
                    "task_description": assignment.task_focus,
                    "dependencies": assignment.dependencies,
                    "status": "not_started",
                }),
            );
        }

        self.store.update_state(
            session_id,
            json!({
                "status": "workers_spawning",
                "coordinator": COORDINATOR,
                "target_service": target_service,
                "coordination_status": {
                    "phase": "worker_preparation",
                    "workers_spawned": [],
                    "workers_completed": [],
                    "workers_pending": worker_types,
                    "synthesis_ready": false,
                },
                "worker_configs": worker_configs,
                "metrics": {
                    "workers_total": plan.worker_assignments.len(),
                },
            }),
        )?;
        Ok(())
    }

    /// Build one dispatch descriptor per assignment. The inline prompt is the
    /// materialized prompt file content, so spawn executors that accept
    /// prompts inline see exactly what file-reading workers see.
    fn build_dispatches(&self, session_id: &str, plan: &OrchestrationPlan) -> Vec<TaskDispatch> {
        let session_path = self.store.session_path(session_id);

        plan.worker_assignments
            .iter()
            .map(|assignment| {
                let prompt_file = prompt_path(&session_path, assignment.worker_type.as_str());
                let prompt = std::fs::read_to_string(&prompt_file).unwrap_or_default();
                TaskDispatch {
                    worker_type: assignment.worker_type,
                    description: format!("Execute {}", assignment.task_focus),
                    prompt,
                }
            })
            .collect()
    }
}
