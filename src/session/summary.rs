//! Human-readable SESSION.md rendering.
//!
//! SESSION.md is derived state: unlike the JSONL streams it may be rewritten
//! whenever coordination reaches a new milestone.

use anyhow::{Context, Result};

use super::store::SessionStore;
use crate::models::OrchestrationPlan;

/// Rewrite SESSION.md after orchestration with the plan summary.
pub fn write_orchestration_summary(
    store: &SessionStore,
    session_id: &str,
    task: &str,
    plan: &OrchestrationPlan,
) -> Result<()> {
    let path = store.session_path(session_id).join("SESSION.md");
    std::fs::write(&path, render_orchestration_summary(session_id, task, plan))
        .with_context(|| format!("Failed to rewrite {}", path.display()))
}

fn render_orchestration_summary(session_id: &str, task: &str, plan: &OrchestrationPlan) -> String {
    // Date prefix of the session id: YYYY-MM-DD
    let session_date = session_id
        .splitn(4, '-')
        .take(3)
        .collect::<Vec<_>>()
        .join("-");

    let mut assignments_md = String::new();
    for assignment in &plan.worker_assignments {
        assignments_md.push_str(&format!(
            "- **{}**: {}\n",
            assignment.worker_type, assignment.task_focus
        ));
    }
    if assignments_md.is_empty() {
        assignments_md.push_str("*No workers assigned*\n");
    }

    let success_criteria = if plan.success_criteria.is_empty() {
        "- Standard completion criteria".to_string()
    } else {
        plan.success_criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let strategy = serde_json::to_string(&plan.execution_strategy)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string();

    format!(
        "# Session: {session_id}\n\
         \n\
         ## Session Details\n\
         - **Session ID**: {session_id}\n\
         - **Date**: {session_date}\n\
         - **Coordinator**: queen-orchestrator\n\
         - **Status**: Workers Assigned - {worker_count} workers ready\n\
         - **Complexity**: Level {complexity}/4\n\
         - **Strategy**: {strategy}\n\
         \n\
         ## Task Overview\n\
         {task}\n\
         \n\
         ## Worker Assignments\n\
         {assignments_md}\
         \n\
         ## Orchestration Plan\n\
         - **Estimated Duration**: {duration}\n\
         - **Worker Count**: {worker_count}\n\
         - **Execution Strategy**: {strategy}\n\
         \n\
         ## Coordination Progress\n\
         - [x] Queen orchestrator activated\n\
         - [x] Task analysis completed\n\
         - [x] Worker assignments generated\n\
         - [x] Worker prompts created\n\
         - [ ] Waiting for worker deployment\n\
         \n\
         ## Success Criteria\n\
         {success_criteria}\n\
         \n\
         ---\n\
         *Generated by queen-orchestrator at {timestamp}*\n",
        session_id = session_id,
        session_date = session_date,
        worker_count = plan.worker_assignments.len(),
        complexity = plan.complexity_assessment,
        strategy = strategy,
        task = task,
        assignments_md = assignments_md,
        duration = plan.estimated_total_duration,
        success_criteria = success_criteria,
        timestamp = plan.timestamp,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, WorkerAssignment, WorkerType};

    #[test]
    fn test_summary_renders_assignments() {
        let plan = OrchestrationPlan {
            timestamp: "2025-08-31T10:22:00Z".to_string(),
            complexity_assessment: 3,
            worker_assignments: vec![WorkerAssignment {
                worker_type: WorkerType::Analyzer,
                priority: Priority::High,
                task_focus: "Audit authentication flows".to_string(),
                dependencies: vec![],
                estimated_duration: "1-2h".to_string(),
                strategic_value: Priority::High,
                rationale: "security risk".to_string(),
            }],
            ..OrchestrationPlan::default()
        };

        let md = render_orchestration_summary(
            "2025-08-31-10-22-audit-crypto-data-service",
            "Audit crypto-data service",
            &plan,
        );

        assert!(md.contains("**Date**: 2025-08-31"));
        assert!(md.contains("**analyzer-worker**: Audit authentication flows"));
        assert!(md.contains("Level 3/4"));
        assert!(md.contains("**Strategy**: parallel"));
    }

    #[test]
    fn test_summary_without_assignments() {
        let plan = OrchestrationPlan::default();
        let md = render_orchestration_summary("2025-08-31-10-22-empty-session-here", "Task", &plan);
        assert!(md.contains("*No workers assigned*"));
        assert!(md.contains("- Standard completion criteria"));
    }
}
