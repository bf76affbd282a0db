//! Bundled worker prompt templates.
//!
//! Templates are external text resources embedded with include_str!, one per
//! worker type, with a generic fallback for unknown types. A project can
//! override any of them by placing `<worker_type>.prompt.j2` under
//! `.hive-forge/templates/` in the project root.

use std::path::Path;

use tracing::debug;

use crate::models::WorkerType;

pub const ANALYZER_TEMPLATE: &str = include_str!("../../templates/analyzer-worker.prompt.j2");
pub const ARCHITECT_TEMPLATE: &str = include_str!("../../templates/architect-worker.prompt.j2");
pub const BACKEND_TEMPLATE: &str = include_str!("../../templates/backend-worker.prompt.j2");
pub const DESIGNER_TEMPLATE: &str = include_str!("../../templates/designer-worker.prompt.j2");
pub const DEVOPS_TEMPLATE: &str = include_str!("../../templates/devops-worker.prompt.j2");
pub const FRONTEND_TEMPLATE: &str = include_str!("../../templates/frontend-worker.prompt.j2");
pub const RESEARCHER_TEMPLATE: &str = include_str!("../../templates/researcher-worker.prompt.j2");
pub const TEST_TEMPLATE: &str = include_str!("../../templates/test-worker.prompt.j2");
pub const SCRIBE_TEMPLATE: &str = include_str!("../../templates/scribe-worker.prompt.j2");
pub const GENERIC_TEMPLATE: &str = include_str!("../../templates/generic.prompt.j2");

/// Setup-phase skeletons with `{{SESSION_ID}}`-style placeholders.
pub const SETUP_NOTES_TEMPLATE: &str = include_str!("../../templates/setup_notes.md");
pub const SETUP_OUTPUT_TEMPLATE: &str = include_str!("../../templates/setup_output.json");

/// Bundled template for a worker type name; unknown names get the generic
/// template (generation still succeeds for them).
pub fn bundled_template(worker_type: &str) -> &'static str {
    match worker_type.parse::<WorkerType>() {
        Ok(WorkerType::Analyzer) => ANALYZER_TEMPLATE,
        Ok(WorkerType::Architect) => ARCHITECT_TEMPLATE,
        Ok(WorkerType::Backend) => BACKEND_TEMPLATE,
        Ok(WorkerType::Designer) => DESIGNER_TEMPLATE,
        Ok(WorkerType::Devops) => DEVOPS_TEMPLATE,
        Ok(WorkerType::Frontend) => FRONTEND_TEMPLATE,
        Ok(WorkerType::Researcher) => RESEARCHER_TEMPLATE,
        Ok(WorkerType::Test) => TEST_TEMPLATE,
        Ok(WorkerType::Scribe) => SCRIBE_TEMPLATE,
        Ok(WorkerType::Queen) | Err(_) => GENERIC_TEMPLATE,
    }
}

/// Resolve the template source for a worker type, preferring a project-local
/// override under `.hive-forge/templates/`.
pub fn resolve_template(project_root: &Path, worker_type: &str) -> String {
    let override_path = project_root
        .join(".hive-forge/templates")
        .join(format!("{}.prompt.j2", worker_type));

    if override_path.exists()
        && let Ok(content) = std::fs::read_to_string(&override_path)
    {
        debug!("Using template override: {:?}", override_path);
        return content;
    }

    bundled_template(worker_type).to_string()
}
