//! Worker setup phase: seed a worker's output slots with skeleton files.
//!
//! The setup sub-mode creates initial notes and JSON documents from bundled
//! template resources with placeholder substitution; the execution phase
//! later overwrites them with real analysis. Both phases go through the same
//! validate-and-enrich pipeline.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::WorkerType;
use crate::prompts::templates::{SETUP_NOTES_TEMPLATE, SETUP_OUTPUT_TEMPLATE};
use crate::session::paths::{notes_path, output_path};
use crate::session::{EventLogger, SessionStore, iso_now};

use super::outputs::{WorkerReport, report_from_value};
use super::profiles;

/// Substitute the `{{NAME}}` placeholders the setup templates use.
fn substitute_placeholders(
    template: &str,
    worker_type: &str,
    session_id: &str,
    timestamp: &str,
    duration: &str,
) -> String {
    template
        .replace("{{WORKER_TYPE}}", worker_type)
        .replace("{{SESSION_ID}}", session_id)
        .replace("{{TIMESTAMP}}", timestamp)
        .replace("{{DURATION}}", duration)
}

/// Render the skeleton report for a worker without touching disk.
pub fn render_setup_report(
    worker_type: WorkerType,
    session_id: &str,
    estimated_duration: &str,
) -> Result<WorkerReport> {
    let profile = profiles::profile(worker_type);
    let timestamp = iso_now();

    let output_json = substitute_placeholders(
        SETUP_OUTPUT_TEMPLATE,
        worker_type.as_str(),
        session_id,
        &timestamp,
        estimated_duration,
    );
    let value: Value =
        serde_json::from_str(&output_json).context("setup output template is not valid JSON")?;
    let mut report = report_from_value(&value)?;

    report.base.notes_markdown = substitute_placeholders(
        SETUP_NOTES_TEMPLATE,
        worker_type.as_str(),
        session_id,
        &timestamp,
        estimated_duration,
    );
    report.enrich(profile, session_id, profile.description);

    Ok(report)
}

/// Create the skeleton notes and JSON files for a worker.
pub fn run_setup(
    store: &SessionStore,
    session_id: &str,
    worker_type: WorkerType,
    estimated_duration: &str,
) -> Result<WorkerReport> {
    store.ensure_session_exists(session_id)?;

    let profile = profiles::profile(worker_type);
    let report = render_setup_report(worker_type, session_id, estimated_duration)?;
    let session_path = store.session_path(session_id);

    let notes_file = notes_path(&session_path, profile.file_prefix);
    std::fs::write(&notes_file, &report.base.notes_markdown)
        .with_context(|| format!("Failed to write {}", notes_file.display()))?;

    let output_file = output_path(&session_path, profile.file_prefix);
    std::fs::write(&output_file, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;

    let logger = EventLogger::new(store.clone(), session_id, worker_type.as_str());
    logger.debug(
        "setup phase created skeleton files",
        serde_json::json!({
            "notes": format!("workers/notes/{}_notes.md", profile.file_prefix),
            "json": format!("workers/json/{}_output.json", profile.file_prefix),
        }),
    );

    Ok(report)
}
