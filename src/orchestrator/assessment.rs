//! Strategic task assessment: classify a task description across eight
//! orthogonal risk dimensions, business impact, scope, and affected services.
//!
//! All classification is a fixed, case-insensitive keyword table over the
//! task text so the same task always yields the same assessment.

use serde::{Deserialize, Serialize};

const SECURITY_KEYWORDS: &[&str] = &[
    "auth", "security", "vulnerability", "encrypt", "token", "permission", "access", "login",
    "user",
];

const PERFORMANCE_KEYWORDS: &[&str] = &[
    "performance", "speed", "optimize", "scale", "load", "cache", "database", "query", "latency",
];

const ARCHITECTURE_KEYWORDS: &[&str] = &[
    "architecture", "design", "pattern", "structure", "refactor", "migrate", "integration",
    "service",
];

const USER_EXPERIENCE_KEYWORDS: &[&str] = &[
    "ui", "ux", "frontend", "interface", "user", "design", "accessibility", "responsive", "mobile",
];

const INFRASTRUCTURE_KEYWORDS: &[&str] = &[
    "deploy", "devops", "infrastructure", "docker", "ci", "cd", "monitoring", "logging",
    "environment",
];

const DATA_KEYWORDS: &[&str] = &[
    "database", "data", "migration", "schema", "model", "sql", "api", "endpoint", "crud",
];

const TESTING_KEYWORDS: &[&str] = &[
    "test", "testing", "quality", "bug", "coverage", "integration", "unit", "e2e", "validation",
];

const RESEARCH_KEYWORDS: &[&str] = &[
    "research", "best", "practice", "standard", "pattern", "library", "framework", "documentation",
];

const BUSINESS_CRITICAL_KEYWORDS: &[&str] = &[
    "critical", "production", "urgent", "blocking", "outage", "down", "broken", "failing",
];

const COMPREHENSIVE_KEYWORDS: &[&str] = &["comprehensive", "audit", "complete"];

/// The eight orthogonal risk dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub security: bool,
    pub performance: bool,
    pub architecture: bool,
    pub user_experience: bool,
    pub infrastructure: bool,
    pub data: bool,
    pub testing: bool,
    pub research: bool,
}

impl RiskFactors {
    /// Number of dimensions flagged true.
    pub fn flagged_count(&self) -> usize {
        [
            self.security,
            self.performance,
            self.architecture,
            self.user_experience,
            self.infrastructure,
            self.data,
            self.testing,
            self.research,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

/// Scope classification, highest matching bucket wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    #[default]
    IsolatedChange,
    FeatureAddition,
    SystemImprovement,
    MajorOverhaul,
}

/// Business impact classification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub critical: bool,
    pub scope: TaskScope,
}

/// Derived signals about coordination difficulty.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexityIndicators {
    pub cross_service: bool,
    pub multiple_domains: bool,
    pub high_risk: bool,
    pub research_heavy: bool,
}

/// Full structured assessment of one task description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskAssessment {
    pub risk_factors: RiskFactors,
    pub business_impact: BusinessImpact,
    /// Affected services matched from the fixed service table
    pub service_scope: Vec<String>,
    pub complexity_indicators: ComplexityIndicators,
    /// Task demands full architecture + quality + implementation + validation
    pub comprehensive: bool,
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

fn classify_scope(task: &str) -> TaskScope {
    if contains_any(task, &["comprehensive", "complete", "overhaul", "redesign", "rewrite"]) {
        TaskScope::MajorOverhaul
    } else if contains_any(task, &["improve", "optimize", "enhance", "upgrade"]) {
        TaskScope::SystemImprovement
    } else if contains_any(task, &["add", "new", "feature", "implement", "create"]) {
        TaskScope::FeatureAddition
    } else {
        TaskScope::IsolatedChange
    }
}

fn affected_services(task: &str) -> Vec<String> {
    let mut services = Vec::new();
    if contains_any(task, &["crypto-data", "market", "price", "trading"]) {
        services.push("crypto-data".to_string());
    }
    if contains_any(task, &["api", "backend", "server", "endpoint", "service"]) {
        services.push("api".to_string());
    }
    if contains_any(task, &["frontend", "ui", "interface", "client", "web"]) {
        services.push("frontend".to_string());
    }
    if contains_any(task, &["sara", "intelligence", "context"]) {
        services.push("sara".to_string());
    }
    if contains_any(task, &["archon", "knowledge", "documentation"]) {
        services.push("archon".to_string());
    }
    services
}

/// Assess a task description. Pure in the task text.
pub fn assess_task(task: &str) -> TaskAssessment {
    let task_lower = task.to_lowercase();

    let risk_factors = RiskFactors {
        security: contains_any(&task_lower, SECURITY_KEYWORDS),
        performance: contains_any(&task_lower, PERFORMANCE_KEYWORDS),
        architecture: contains_any(&task_lower, ARCHITECTURE_KEYWORDS),
        user_experience: contains_any(&task_lower, USER_EXPERIENCE_KEYWORDS),
        infrastructure: contains_any(&task_lower, INFRASTRUCTURE_KEYWORDS),
        data: contains_any(&task_lower, DATA_KEYWORDS),
        testing: contains_any(&task_lower, TESTING_KEYWORDS),
        research: contains_any(&task_lower, RESEARCH_KEYWORDS),
    };

    let service_scope = affected_services(&task_lower);

    let multiple_domains = [
        risk_factors.security,
        risk_factors.performance,
        risk_factors.architecture,
        risk_factors.user_experience,
    ]
    .iter()
    .filter(|flag| **flag)
    .count()
        > 2;

    let complexity_indicators = ComplexityIndicators {
        cross_service: service_scope.len() > 1,
        multiple_domains,
        high_risk: risk_factors.security && risk_factors.performance,
        research_heavy: risk_factors.research
            || contains_any(&task_lower, &["best", "standard", "pattern"]),
    };

    TaskAssessment {
        risk_factors,
        business_impact: BusinessImpact {
            critical: contains_any(&task_lower, BUSINESS_CRITICAL_KEYWORDS),
            scope: classify_scope(&task_lower),
        },
        service_scope,
        complexity_indicators,
        comprehensive: contains_any(&task_lower, COMPREHENSIVE_KEYWORDS),
    }
}

/// Estimate technical complexity (1-4) from the assessment.
pub fn estimate_complexity(assessment: &TaskAssessment) -> u8 {
    let mut complexity: u8 = match assessment.business_impact.scope {
        TaskScope::IsolatedChange => 1,
        TaskScope::FeatureAddition => 2,
        TaskScope::SystemImprovement => 3,
        TaskScope::MajorOverhaul => 4,
    };

    if assessment.complexity_indicators.cross_service
        || assessment.complexity_indicators.multiple_domains
    {
        complexity = complexity.saturating_add(1);
    }

    complexity.clamp(1, 4)
}

/// Coordination complexity (1-5), a property of the worker fan-out rather
/// than the task itself.
pub fn coordination_complexity(assessment: &TaskAssessment, worker_count: usize) -> u8 {
    let mut score: u8 = match worker_count {
        0 | 1 => 1,
        2 | 3 => 2,
        4 | 5 => 3,
        _ => 4,
    };
    if assessment.complexity_indicators.cross_service {
        score = score.saturating_add(1);
    }
    score.clamp(1, 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typo_fix_is_minimal() {
        let assessment = assess_task("Fix a typo in a single API error message");
        assert!(assessment.risk_factors.data); // "api"
        assert!(!assessment.risk_factors.security);
        assert_eq!(assessment.business_impact.scope, TaskScope::IsolatedChange);
        assert_eq!(estimate_complexity(&assessment), 1);
        assert!(!assessment.comprehensive);
    }

    #[test]
    fn test_comprehensive_audit_is_major() {
        let assessment =
            assess_task("Comprehensive security and performance audit of the entire platform");
        assert!(assessment.risk_factors.security);
        assert!(assessment.risk_factors.performance);
        assert!(assessment.comprehensive);
        assert_eq!(assessment.business_impact.scope, TaskScope::MajorOverhaul);
        assert_eq!(estimate_complexity(&assessment), 4);
        assert!(assessment.complexity_indicators.high_risk);
    }

    #[test]
    fn test_service_scope_matching() {
        let assessment = assess_task("Sync crypto-data prices into the frontend dashboard");
        assert!(assessment.service_scope.contains(&"crypto-data".to_string()));
        assert!(assessment.service_scope.contains(&"frontend".to_string()));
        assert!(assessment.complexity_indicators.cross_service);
    }

    #[test]
    fn test_business_critical_detection() {
        let assessment = assess_task("Production outage: API returning 500s");
        assert!(assessment.business_impact.critical);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let assessment = assess_task("AUDIT the AUTH flow");
        assert!(assessment.risk_factors.security);
        assert!(assessment.comprehensive);
    }

    #[test]
    fn test_coordination_complexity_scales_with_fanout() {
        let assessment = assess_task("simple change");
        assert_eq!(coordination_complexity(&assessment, 1), 1);
        assert_eq!(coordination_complexity(&assessment, 4), 3);
        assert!(coordination_complexity(&assessment, 8) >= 4);
    }
}
