//! The fixed worker-type table: per-type customization points consumed by
//! the prompt generator and the worker runner envelope.
//!
//! Specialties are opaque to the core; they differ only in prompt content,
//! output schema tag, and the file prefix their artifacts are written under.

use crate::models::WorkerType;

/// Static customization record for one worker type.
#[derive(Debug, Clone, Copy)]
pub struct WorkerProfile {
    pub worker_type: WorkerType,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Prefix for `workers/notes/<prefix>_notes.md` and
    /// `workers/json/<prefix>_output.json`
    pub file_prefix: &'static str,
    pub expertise: &'static str,
    pub tools: &'static [&'static str],
    /// Files the worker is expected to produce under `workers/notes/`
    pub expected_outputs: &'static [&'static str],
    pub focus_areas: &'static [&'static str],
    /// Domain score keys snapshotted into session state at completion
    pub score_keys: &'static [&'static str],
}

/// Resolve the profile for a worker type.
pub fn profile(worker_type: WorkerType) -> &'static WorkerProfile {
    PROFILES
        .iter()
        .find(|p| p.worker_type == worker_type)
        .expect("every worker type has a profile")
}

static PROFILES: [WorkerProfile; 10] = [
    WorkerProfile {
        worker_type: WorkerType::Analyzer,
        display_name: "Analyzer Worker",
        description: "Security, performance, and code quality assessment",
        file_prefix: "analyzer",
        expertise: "Security analysis, performance optimization, code quality assessment",
        tools: &["security scanners", "performance profilers", "code analyzers"],
        expected_outputs: &[
            "security_analysis.md",
            "performance_assessment.md",
            "quality_report.md",
        ],
        focus_areas: &[
            "vulnerabilities",
            "performance bottlenecks",
            "code smells",
            "security patterns",
        ],
        score_keys: &["security_score", "performance_score", "quality_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Architect,
        display_name: "Architect Worker",
        description: "System design, technical architecture, scalability",
        file_prefix: "architect",
        expertise: "System design, scalability patterns, technical architecture",
        tools: &["architecture analyzers", "pattern matchers", "dependency mappers"],
        expected_outputs: &[
            "architecture_analysis.md",
            "scalability_recommendations.md",
            "design_patterns.md",
        ],
        focus_areas: &["system design", "scalability", "maintainability", "technical debt"],
        score_keys: &["architecture_score", "scalability_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Backend,
        display_name: "Backend Worker",
        description: "API development, service implementation, database design",
        file_prefix: "backend",
        expertise: "API development, database design, service implementation",
        tools: &["API analyzers", "database schema tools", "service mappers"],
        expected_outputs: &[
            "backend_analysis.md",
            "api_recommendations.md",
            "database_assessment.md",
        ],
        focus_areas: &["API design", "data models", "business logic", "integration patterns"],
        score_keys: &["api_design_score", "data_model_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Designer,
        display_name: "Designer Worker",
        description: "Visual design, user experience, accessibility",
        file_prefix: "designer",
        expertise: "User experience design, visual design, accessibility",
        tools: &["design analyzers", "accessibility checkers", "usability evaluators"],
        expected_outputs: &[
            "design_analysis.md",
            "accessibility_report.md",
            "ux_recommendations.md",
        ],
        focus_areas: &["user experience", "accessibility", "visual design", "usability"],
        score_keys: &["accessibility_score", "usability_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Devops,
        display_name: "DevOps Worker",
        description: "Infrastructure, deployment, monitoring, CI/CD",
        file_prefix: "devops",
        expertise: "Infrastructure, deployment, monitoring, CI/CD pipelines",
        tools: &["infrastructure scanners", "deployment analyzers", "monitoring tools"],
        expected_outputs: &[
            "infrastructure_analysis.md",
            "deployment_recommendations.md",
            "monitoring_assessment.md",
        ],
        focus_areas: &["infrastructure", "deployment", "monitoring", "automation"],
        score_keys: &["infrastructure_score", "automation_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Frontend,
        display_name: "Frontend Worker",
        description: "UI/UX implementation, component architecture",
        file_prefix: "frontend",
        expertise: "UI/UX implementation, component architecture, state management",
        tools: &["component analyzers", "bundle analyzers", "accessibility checkers"],
        expected_outputs: &[
            "frontend_analysis.md",
            "component_recommendations.md",
            "ux_assessment.md",
        ],
        focus_areas: &["component structure", "state management", "user experience", "performance"],
        score_keys: &["component_quality_score", "ux_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Researcher,
        display_name: "Researcher Worker",
        description: "Technical research, best practices, standards",
        file_prefix: "researcher",
        expertise: "Technical research, best practices, industry standards",
        tools: &["research databases", "pattern libraries", "standards analyzers"],
        expected_outputs: &[
            "research_findings.md",
            "best_practices.md",
            "standards_compliance.md",
        ],
        focus_areas: &[
            "best practices",
            "industry standards",
            "emerging patterns",
            "technology trends",
        ],
        score_keys: &["confidence_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Test,
        display_name: "Test Worker",
        description: "Testing strategy, quality assurance, coverage",
        file_prefix: "test",
        expertise: "Testing strategy, quality assurance, test coverage",
        tools: &["test analyzers", "coverage tools", "quality metrics"],
        expected_outputs: &[
            "testing_analysis.md",
            "coverage_report.md",
            "quality_recommendations.md",
        ],
        focus_areas: &["test coverage", "quality metrics", "testing strategy", "automated testing"],
        score_keys: &["coverage_score", "test_quality_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Scribe,
        display_name: "Scribe Worker",
        description: "Synthesis of worker outputs into the session research artifact",
        file_prefix: "scribe",
        expertise: "Documentation, synthesis, cross-worker aggregation",
        tools: &["session event log", "worker output documents"],
        expected_outputs: &["synthesis_notes.md"],
        focus_areas: &["aggregation", "deduplication", "cross-worker handoffs"],
        score_keys: &["documentation_score"],
    },
    WorkerProfile {
        worker_type: WorkerType::Queen,
        display_name: "Queen Orchestrator",
        description: "Strategic task analysis, worker selection, and coordination",
        file_prefix: "queen",
        expertise: "Strategic coordination, worker selection, dependency planning",
        tools: &["task assessment", "worker evaluation"],
        expected_outputs: &[],
        focus_areas: &["coordination", "worker selection", "execution strategy"],
        score_keys: &[],
    },
];
