//! Worker selection and deterministic plan assembly.
//!
//! Selection is recommendation-based, not a fixed formula: each flagged risk
//! dimension recommends a worker type with a strategic value and a textual
//! reason. Recommendations are deduplicated, bounded, and wired with
//! dependency edges from a fixed table filtered to preserve acyclicity.
//!
//! The same machinery doubles as the orchestrator's fallback: when the model
//! returns a structurally invalid plan, a deterministic keyword-based plan is
//! synthesized from the task text.

use crate::models::{
    ExecutionStrategy, OrchestrationPlan, PlanStatus, Priority, WorkerAssignment, WorkerType,
};
use crate::session::iso_now;

use super::assessment::{self, TaskAssessment};

/// Upper bound on workers even for the most complex task.
pub const MAX_WORKERS: usize = 8;

/// Minimum fan-out forced for comprehensive/audit/complete tasks:
/// architecture, quality, implementation, validation, and operations
/// coverage.
const COMPREHENSIVE_MINIMUM: [WorkerType; 5] = [
    WorkerType::Architect,
    WorkerType::Analyzer,
    WorkerType::Backend,
    WorkerType::Test,
    WorkerType::Devops,
];

/// One recommendation produced by the selection rules.
#[derive(Debug, Clone)]
pub struct WorkerRecommendation {
    pub worker_type: WorkerType,
    pub strategic_value: Priority,
    pub reason: String,
}

fn recommend(worker_type: WorkerType, strategic_value: Priority, reason: &str) -> WorkerRecommendation {
    WorkerRecommendation {
        worker_type,
        strategic_value,
        reason: reason.to_string(),
    }
}

/// Apply the per-dimension recommendation rules.
pub fn recommend_workers(task: &str, assessment: &TaskAssessment) -> Vec<WorkerRecommendation> {
    let task_lower = task.to_lowercase();
    let risks = &assessment.risk_factors;
    let indicators = &assessment.complexity_indicators;
    let scope = &assessment.service_scope;
    let mut recommendations = Vec::new();

    if risks.security || risks.performance {
        recommendations.push(recommend(
            WorkerType::Analyzer,
            Priority::High,
            "Security or performance implications require expert analysis to prevent critical issues",
        ));
    }

    if risks.architecture || indicators.cross_service || indicators.multiple_domains {
        recommendations.push(recommend(
            WorkerType::Architect,
            Priority::High,
            "Complex architectural implications or cross-service coordination requires system design expertise",
        ));
    }

    if risks.data
        || scope.iter().any(|s| s == "api" || s == "crypto-data" || s == "sara")
    {
        recommendations.push(recommend(
            WorkerType::Backend,
            Priority::Medium,
            "Data/API changes or backend service involvement requires implementation expertise",
        ));
    }

    if risks.user_experience || scope.iter().any(|s| s == "frontend") {
        recommendations.push(recommend(
            WorkerType::Frontend,
            Priority::Medium,
            "UI/UX implications require frontend implementation expertise",
        ));

        if ["design", "interface", "accessibility"]
            .iter()
            .any(|kw| task_lower.contains(kw))
        {
            recommendations.push(recommend(
                WorkerType::Designer,
                Priority::Low,
                "Visual design and accessibility considerations for optimal user experience",
            ));
        }
    }

    if risks.infrastructure || assessment.business_impact.critical {
        recommendations.push(recommend(
            WorkerType::Devops,
            Priority::Medium,
            "Infrastructure implications or business-critical deployment requires DevOps expertise",
        ));
    }

    if indicators.research_heavy || risks.research {
        recommendations.push(recommend(
            WorkerType::Researcher,
            Priority::Medium,
            "Research-heavy task requires investigation of best practices and standards",
        ));
    }

    if risks.testing || assessment.business_impact.critical || indicators.cross_service {
        recommendations.push(recommend(
            WorkerType::Test,
            Priority::Low,
            "Quality assurance needed for business-critical or cross-service changes",
        ));
    }

    recommendations
}

/// Select the final worker set: dedup, force the comprehensive minimum,
/// guarantee at least one worker, and bound the fan-out.
pub fn select_workers(task: &str, assessment: &TaskAssessment) -> Vec<WorkerRecommendation> {
    let mut selected = Vec::new();
    let mut chosen: Vec<WorkerType> = Vec::new();

    for recommendation in recommend_workers(task, assessment) {
        if !chosen.contains(&recommendation.worker_type) {
            chosen.push(recommendation.worker_type);
            selected.push(recommendation);
        }
    }

    if assessment.comprehensive {
        for worker_type in COMPREHENSIVE_MINIMUM {
            if !chosen.contains(&worker_type) {
                chosen.push(worker_type);
                selected.push(recommend(
                    worker_type,
                    Priority::Medium,
                    "Comprehensive coverage requires architecture, quality, implementation, and validation expertise",
                ));
            }
        }
    }

    if selected.is_empty() {
        selected.push(recommend(
            WorkerType::Backend,
            Priority::Medium,
            "No specific dimension flagged; default implementation expertise",
        ));
    }

    if selected.len() > MAX_WORKERS {
        // Keep the strategically most valuable workers
        selected.sort_by_key(|r| strategic_rank(r.strategic_value));
        selected.truncate(MAX_WORKERS);
    }

    selected
}

fn strategic_rank(value: Priority) -> u8 {
    match value {
        Priority::Critical => 0,
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
    }
}

/// Fixed dependency-edge table, filtered to workers present in the selection.
/// The table is a DAG, so the filtered result stays acyclic.
pub fn dependency_edges(selected: &[WorkerType], worker_type: WorkerType) -> Vec<String> {
    let deps: &[WorkerType] = match worker_type {
        WorkerType::Frontend => &[WorkerType::Backend],
        WorkerType::Designer => &[WorkerType::Frontend],
        WorkerType::Test => &[WorkerType::Backend, WorkerType::Frontend],
        _ => &[],
    };

    deps.iter()
        .filter(|dep| selected.contains(dep))
        .map(|dep| dep.as_str().to_string())
        .collect()
}

/// Execution strategy for the selected set.
pub fn choose_strategy(assignments: &[WorkerAssignment]) -> ExecutionStrategy {
    let has_edges = assignments.iter().any(|a| !a.dependencies.is_empty());
    if !has_edges {
        ExecutionStrategy::Parallel
    } else if assignments.len() > 2 {
        ExecutionStrategy::Hybrid
    } else {
        ExecutionStrategy::Sequential
    }
}

/// Per-worker duration bucket keyed by complexity.
pub fn duration_bucket(complexity: u8) -> &'static str {
    match complexity {
        1 => "30min",
        2 => "1-2h",
        3 => "2-4h",
        _ => "4-8h",
    }
}

/// Total duration bucket keyed by complexity.
pub fn total_duration_bucket(complexity: u8) -> &'static str {
    match complexity {
        1 => "1h",
        2 => "2-4h",
        3 => "4-8h",
        _ => "1-2d",
    }
}

/// Specialized one-to-three-sentence refinement of the overall task for one
/// worker type.
pub fn task_focus(worker_type: WorkerType, task: &str) -> String {
    match worker_type {
        WorkerType::Analyzer => format!(
            "Assess security and performance implications of: {}. Classify findings by severity with concrete evidence.",
            task
        ),
        WorkerType::Architect => format!(
            "Evaluate the system design impact of: {}. Identify affected boundaries and scalability constraints.",
            task
        ),
        WorkerType::Backend => format!(
            "Plan the backend work for: {}. Cover API contracts, data models, and service logic.",
            task
        ),
        WorkerType::Frontend => format!(
            "Plan the frontend work for: {}. Cover component structure, state management, and user-visible behavior.",
            task
        ),
        WorkerType::Designer => format!(
            "Review user experience and accessibility implications of: {}.",
            task
        ),
        WorkerType::Devops => format!(
            "Assess infrastructure, deployment, and monitoring impact of: {}.",
            task
        ),
        WorkerType::Researcher => format!(
            "Research established practice and standards relevant to: {}. Report verifiable sources.",
            task
        ),
        WorkerType::Test => format!(
            "Define the testing strategy for: {}. Map the risk surface to concrete coverage.",
            task
        ),
        WorkerType::Scribe => format!("Synthesize all worker outputs for: {}.", task),
        WorkerType::Queen => format!("Coordinate workers for: {}.", task),
    }
}

/// Assemble worker assignments for a selection.
pub fn build_assignments(
    task: &str,
    assessment: &TaskAssessment,
    complexity: u8,
    selection: &[WorkerRecommendation],
) -> Vec<WorkerAssignment> {
    let selected_types: Vec<WorkerType> = selection.iter().map(|r| r.worker_type).collect();

    selection
        .iter()
        .map(|recommendation| {
            let priority = if assessment.business_impact.critical {
                match recommendation.strategic_value {
                    Priority::Low => Priority::Medium,
                    Priority::Medium => Priority::High,
                    other => other,
                }
            } else {
                recommendation.strategic_value
            };

            WorkerAssignment {
                worker_type: recommendation.worker_type,
                priority,
                task_focus: task_focus(recommendation.worker_type, task),
                dependencies: dependency_edges(&selected_types, recommendation.worker_type),
                estimated_duration: duration_bucket(complexity).to_string(),
                strategic_value: recommendation.strategic_value,
                rationale: recommendation.reason.clone(),
            }
        })
        .collect()
}

/// Synthesize a complete deterministic plan from the task text alone.
///
/// Used when the model returns structurally invalid plan JSON. Complexity is
/// capped at 3; at least one assignment is always produced.
pub fn fallback_plan(session_id: &str, task: &str) -> OrchestrationPlan {
    let assessment = assessment::assess_task(task);
    let complexity = assessment::estimate_complexity(&assessment).min(3);
    let selection = select_workers(task, &assessment);
    let assignments = build_assignments(task, &assessment, complexity, &selection);
    let strategy = choose_strategy(&assignments);

    OrchestrationPlan {
        session_id: session_id.to_string(),
        timestamp: iso_now(),
        status: PlanStatus::Completed,
        task_summary: task.to_string(),
        complexity_assessment: complexity,
        coordination_complexity: assessment::coordination_complexity(&assessment, assignments.len()),
        orchestration_rationale: format!(
            "Fallback plan synthesized deterministically from task keywords ({} flagged dimensions); model plan was structurally invalid",
            assessment.risk_factors.flagged_count()
        ),
        estimated_total_duration: total_duration_bucket(complexity).to_string(),
        worker_assignments: assignments,
        execution_strategy: strategy,
        coordination_notes: coordination_notes(&assessment),
        success_criteria: vec![
            "All assigned workers report completed status".to_string(),
            "Synthesis artifact aggregates every worker output".to_string(),
        ],
        ..OrchestrationPlan::default()
    }
}

/// Human-readable coordination notes derived from the assessment.
pub fn coordination_notes(assessment: &TaskAssessment) -> Vec<String> {
    let mut notes = Vec::new();

    if assessment.service_scope.is_empty() {
        notes.push("Single service task".to_string());
    } else {
        notes.push(format!(
            "Task spans {} service(s): {}",
            assessment.service_scope.len(),
            assessment.service_scope.join(", ")
        ));
    }

    let risks = &assessment.risk_factors;
    let flagged: Vec<&str> = [
        ("security", risks.security),
        ("performance", risks.performance),
        ("architecture", risks.architecture),
        ("user_experience", risks.user_experience),
        ("infrastructure", risks.infrastructure),
        ("data", risks.data),
        ("testing", risks.testing),
        ("research", risks.research),
    ]
    .iter()
    .filter(|(_, flag)| *flag)
    .map(|(name, _)| *name)
    .collect();

    if flagged.is_empty() {
        notes.push("Low risk task".to_string());
    } else {
        notes.push(format!("Risk factors identified: {}", flagged.join(", ")));
    }

    if assessment.business_impact.critical {
        notes.push("Business critical - prioritize thoroughness".to_string());
    } else {
        notes.push("Standard priority task".to_string());
    }

    notes
}
