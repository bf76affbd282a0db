//! Prompt generation: materialize one prompt file per assigned worker from
//! an orchestration plan.
//!
//! The batch is all-or-nothing: a write failure removes any files already
//! written for this batch and no success event is emitted. A successful
//! batch emits exactly one consolidated `worker_prompts_created` event.

pub mod templates;

use std::path::PathBuf;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::models::{OrchestrationPlan, WorkerAssignment};
use crate::session::paths::prompt_path;
use crate::session::{EventLogger, SessionStore, event_types};
use crate::worker::profiles;

/// Standard success-criteria block rendered into every worker prompt.
pub const SUCCESS_CRITERIA: [&str; 5] = [
    "Complete analysis of assigned focus areas",
    "Generate comprehensive findings with evidence",
    "Provide actionable recommendations",
    "Document potential risks and mitigation strategies",
    "Create required output files",
];

/// Generates worker prompt files for a session.
pub struct PromptGenerator {
    store: SessionStore,
    logger: EventLogger,
    session_id: String,
}

impl PromptGenerator {
    pub fn new(store: SessionStore, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let logger = EventLogger::new(store.clone(), session_id.clone(), "queen-orchestrator");
        Self {
            store,
            logger,
            session_id,
        }
    }

    /// Write `workers/prompts/<worker_type>.prompt` for every assignment in
    /// the plan. Returns the created paths in assignment order.
    pub fn generate_for_plan(&self, plan: &OrchestrationPlan) -> Result<Vec<PathBuf>> {
        let session_path = self.store.session_path(&self.session_id);
        let mut written: Vec<PathBuf> = Vec::new();

        for assignment in &plan.worker_assignments {
            let result = self
                .render_assignment(plan, assignment)
                .and_then(|content| {
                    let path = prompt_path(&session_path, assignment.worker_type.as_str());
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    Ok(path)
                });

            match result {
                Ok(path) => written.push(path),
                Err(err) => {
                    // All-or-nothing: remove this batch's partial output
                    for path in &written {
                        let _ = std::fs::remove_file(path);
                    }
                    return Err(err.context(format!(
                        "prompt generation failed for '{}'",
                        assignment.worker_type
                    )));
                }
            }
        }

        if !written.is_empty() {
            self.logger.event(
                event_types::WORKER_PROMPTS_CREATED,
                serde_json::json!({
                    "worker_types": plan
                        .worker_assignments
                        .iter()
                        .map(|a| a.worker_type.as_str())
                        .collect::<Vec<_>>(),
                    "total_prompts": written.len(),
                    "prompt_folder": "workers/prompts",
                    "complexity_level": plan.complexity_assessment,
                }),
            );
        }

        Ok(written)
    }

    fn render_assignment(
        &self,
        plan: &OrchestrationPlan,
        assignment: &WorkerAssignment,
    ) -> Result<String> {
        let worker_type = assignment.worker_type.as_str();
        let profile = profiles::profile(assignment.worker_type);
        let source = templates::resolve_template(self.store.project_root(), worker_type);

        let mut env = Environment::new();
        env.add_template("prompt", &source)
            .with_context(|| format!("invalid prompt template for '{}'", worker_type))?;
        let template = env.get_template("prompt").expect("template was added");

        template
            .render(context! {
                worker_type => worker_type,
                session_id => self.session_id,
                task_focus => assignment.task_focus,
                priority => assignment.priority,
                estimated_duration => assignment.estimated_duration,
                complexity_level => plan.complexity_assessment,
                dependencies => assignment.dependencies,
                focus_areas => profile.focus_areas,
                expertise => profile.expertise,
                rationale => assignment.rationale,
                success_criteria => SUCCESS_CRITERIA,
                output_files => profile.expected_outputs,
                tools => profile.tools,
                file_prefix => profile.file_prefix,
                insights => plan.codebase_insights,
            })
            .with_context(|| format!("failed to render prompt for '{}'", worker_type))
    }
}
