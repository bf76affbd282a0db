//! Scribe aggregation: fold every worker's structured output into the
//! session's single synthesis artifact.
//!
//! Aggregation is deterministic - findings and recommendations are collected,
//! deduplicated, and counted, never re-authored. The monitor's
//! `all_workers_completed` event is the gate; synthesis before that signal is
//! a protocol violation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use crate::errors::HiveError;
use crate::models::WorkerType;
use crate::session::paths::{notes_path, output_path};
use crate::session::{EventLogger, SessionStore, event_types, iso_now, read_jsonl};

use super::outputs::WorkerReport;
use super::profiles;

/// Name of the synthesis artifact at the session root.
pub const SYNTHESIS_FILE: &str = "SYNTHESIS.md";

/// Result of a synthesis run.
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub artifact_path: PathBuf,
    pub report: WorkerReport,
    /// Worker types whose outputs were aggregated
    pub sources: Vec<String>,
}

/// Aggregate all worker outputs into SYNTHESIS.md and the scribe's own
/// output slots, then close the session.
pub fn synthesize(store: &SessionStore, session_id: &str) -> Result<SynthesisOutcome> {
    store.ensure_session_exists(session_id)?;
    let session_path = store.session_path(session_id);
    let logger = EventLogger::new(store.clone(), session_id, WorkerType::Scribe.as_str());

    // Readiness gate: only the monitor may authorize synthesis.
    let events = read_jsonl(&session_path.join("EVENTS.jsonl"))?;
    let gated = events
        .iter()
        .any(|e| e["type"] == event_types::ALL_WORKERS_COMPLETED);
    if !gated {
        return Err(HiveError::ProtocolViolation(
            "synthesis requested before the monitor emitted all_workers_completed".to_string(),
        )
        .into());
    }

    let scribe_profile = profiles::profile(WorkerType::Scribe);
    let mut sources: Vec<String> = Vec::new();
    let mut reports: Vec<WorkerReport> = Vec::new();

    let json_dir = session_path.join("workers/json");
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&json_dir)
        .with_context(|| format!("Failed to read {}", json_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // The scribe never aggregates its own slot
        if file_name.starts_with(scribe_profile.file_prefix) {
            continue;
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match serde_json::from_str::<WorkerReport>(&raw) {
            Ok(report) => {
                sources.push(if report.base.worker.is_empty() {
                    file_name
                } else {
                    report.base.worker.clone()
                });
                reports.push(report);
            }
            Err(err) => {
                logger.warning(
                    "skipping malformed worker output",
                    json!({"file": file_name, "error": err.to_string()}),
                );
            }
        }
    }

    let state = store.read_state_typed(session_id)?;
    let artifact = render_synthesis(&state.task, session_id, &sources, &reports);

    let artifact_path = session_path.join(SYNTHESIS_FILE);
    std::fs::write(&artifact_path, &artifact)
        .with_context(|| format!("Failed to write {}", artifact_path.display()))?;

    // The scribe's own output follows the standard worker emission shape.
    let mut scribe_report = aggregate_report(&reports);
    scribe_report.base.notes_markdown = artifact;
    scribe_report.enrich(scribe_profile, session_id, "Synthesize worker outputs");

    std::fs::write(
        notes_path(&session_path, scribe_profile.file_prefix),
        &scribe_report.base.notes_markdown,
    )?;
    std::fs::write(
        output_path(&session_path, scribe_profile.file_prefix),
        serde_json::to_string_pretty(&scribe_report)?,
    )?;

    logger.event(
        event_types::SYNTHESIS_CREATED,
        json!({
            "artifact": SYNTHESIS_FILE,
            "workers_aggregated": sources,
            "findings_total": scribe_report.findings.len(),
        }),
    );

    store.close_session(session_id)?;
    logger.event(
        event_types::SESSION_COMPLETED,
        json!({"synthesis": SYNTHESIS_FILE}),
    );

    Ok(SynthesisOutcome {
        artifact_path,
        report: scribe_report,
        sources,
    })
}

/// Fold the worker reports into the scribe's aggregate report.
fn aggregate_report(reports: &[WorkerReport]) -> WorkerReport {
    let mut aggregate = WorkerReport::default();

    for report in reports {
        aggregate
            .base
            .summary
            .key_findings
            .extend(report.base.summary.key_findings.iter().cloned());
        aggregate
            .base
            .summary
            .critical_issues
            .extend(report.base.summary.critical_issues.iter().cloned());
        aggregate
            .base
            .summary
            .recommendations
            .extend(report.base.summary.recommendations.iter().cloned());
        aggregate.findings.extend(report.findings.iter().cloned());
        aggregate.base.metrics.items_analyzed += report.base.metrics.items_analyzed;
        aggregate.base.metrics.issues_found += report.base.metrics.issues_found;
        for (severity, count) in &report.base.metrics.severity_breakdown {
            *aggregate
                .base
                .metrics
                .severity_breakdown
                .entry(severity.clone())
                .or_insert(0) += count;
        }
        aggregate
            .base
            .files_examined
            .extend(report.base.files_examined.iter().cloned());
        aggregate
            .base
            .next_actions
            .extend(report.base.next_actions.iter().cloned());
    }

    aggregate.base.summary.key_findings = dedup_preserve(aggregate.base.summary.key_findings);
    aggregate.base.summary.critical_issues =
        dedup_preserve(aggregate.base.summary.critical_issues);
    aggregate.base.summary.recommendations =
        dedup_preserve(aggregate.base.summary.recommendations);
    aggregate.base.files_examined = dedup_preserve(aggregate.base.files_examined);
    aggregate.base.next_actions = dedup_preserve(aggregate.base.next_actions);

    aggregate
}

fn dedup_preserve(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn render_synthesis(
    task: &str,
    session_id: &str,
    sources: &[String],
    reports: &[WorkerReport],
) -> String {
    let aggregate = aggregate_report(reports);

    let mut md = String::new();
    md.push_str(&format!("# Synthesis: {}\n\n", task));
    md.push_str(&format!("- **Session**: {}\n", session_id));
    md.push_str(&format!("- **Generated**: {}\n", iso_now()));
    md.push_str(&format!(
        "- **Workers aggregated**: {}\n\n",
        if sources.is_empty() {
            "none".to_string()
        } else {
            sources.join(", ")
        }
    ));

    if !aggregate.base.summary.key_findings.is_empty() {
        md.push_str("## Key Findings\n\n");
        for finding in &aggregate.base.summary.key_findings {
            md.push_str(&format!("- {}\n", finding));
        }
        md.push('\n');
    }

    if !aggregate.base.summary.critical_issues.is_empty() {
        md.push_str("## Critical Issues\n\n");
        for issue in &aggregate.base.summary.critical_issues {
            md.push_str(&format!("- {}\n", issue));
        }
        md.push('\n');
    }

    if !aggregate.findings.is_empty() {
        md.push_str("## Findings by Severity\n\n");
        let mut by_severity: BTreeMap<&str, Vec<&crate::models::Finding>> = BTreeMap::new();
        for finding in &aggregate.findings {
            by_severity
                .entry(finding.severity.as_str())
                .or_default()
                .push(finding);
        }
        for severity in ["critical", "high", "medium", "low"] {
            if let Some(findings) = by_severity.get(severity) {
                md.push_str(&format!("### {}\n\n", severity));
                for finding in findings {
                    md.push_str(&format!("- {}", finding.description));
                    if !finding.recommendation.is_empty() {
                        md.push_str(&format!(" (*{}*)", finding.recommendation));
                    }
                    md.push('\n');
                }
                md.push('\n');
            }
        }
    }

    if !aggregate.base.summary.recommendations.is_empty() {
        md.push_str("## Recommendations\n\n");
        for recommendation in &aggregate.base.summary.recommendations {
            md.push_str(&format!("- {}\n", recommendation));
        }
        md.push('\n');
    }

    if !aggregate.base.files_examined.is_empty() {
        md.push_str("## Files Examined\n\n");
        for file in &aggregate.base.files_examined {
            md.push_str(&format!("- `{}`\n", file));
        }
        md.push('\n');
    }

    if !aggregate.base.next_actions.is_empty() {
        md.push_str("## Next Actions\n\n");
        for action in &aggregate.base.next_actions {
            md.push_str(&format!("- {}\n", action));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, Severity};
    use tempfile::tempdir;

    fn ready_session() -> (tempfile::TempDir, SessionStore, String) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Docs/hive-mind")).unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let created = store.create_session("Synthesis test session here", 2).unwrap();
        (dir, store, created.session_id)
    }

    fn write_worker_output(store: &SessionStore, session_id: &str, prefix: &str, report: &WorkerReport) {
        let path = store
            .session_path(session_id)
            .join(format!("workers/json/{}_output.json", prefix));
        std::fs::write(path, serde_json::to_string_pretty(report).unwrap()).unwrap();
    }

    fn signal_ready(store: &SessionStore, session_id: &str) {
        store
            .append_event(
                session_id,
                json!({"type": "all_workers_completed", "agent": "queen-orchestrator", "details": {}}),
            )
            .unwrap();
    }

    #[test]
    fn test_synthesis_gated_on_monitor_signal() {
        let (_dir, store, session_id) = ready_session();
        let err = synthesize(&store, &session_id).unwrap_err();
        assert!(err.to_string().contains("all_workers_completed"));
        assert!(!store.session_path(&session_id).join(SYNTHESIS_FILE).exists());
    }

    #[test]
    fn test_synthesis_aggregates_outputs() {
        let (_dir, store, session_id) = ready_session();

        let mut analyzer = WorkerReport::default();
        analyzer.base.worker = "analyzer-worker".to_string();
        analyzer.base.summary.key_findings = vec!["auth flow lacks rate limiting".to_string()];
        analyzer.base.summary.recommendations = vec!["add rate limiting".to_string()];
        analyzer.findings.push(Finding {
            severity: Severity::Critical,
            description: "plaintext credentials in logs".to_string(),
            recommendation: "redact secrets".to_string(),
            ..Finding::default()
        });
        analyzer.base.metrics.issues_found = 1;
        write_worker_output(&store, &session_id, "analyzer", &analyzer);

        let mut backend = WorkerReport::default();
        backend.base.worker = "backend-worker".to_string();
        backend.base.summary.recommendations = vec!["add rate limiting".to_string()];
        backend.base.files_examined = vec!["src/api/auth.rs".to_string()];
        write_worker_output(&store, &session_id, "backend", &backend);

        signal_ready(&store, &session_id);
        let outcome = synthesize(&store, &session_id).unwrap();

        assert_eq!(outcome.sources, vec!["analyzer-worker", "backend-worker"]);
        let artifact = std::fs::read_to_string(&outcome.artifact_path).unwrap();
        assert!(artifact.contains("plaintext credentials in logs"));
        assert!(artifact.contains("`src/api/auth.rs`"));
        // Duplicate recommendations collapse
        assert_eq!(artifact.matches("add rate limiting").count(), 1);

        // Scribe output slots were written and the session closed
        let session_path = store.session_path(&session_id);
        assert!(session_path.join("workers/json/scribe_output.json").is_file());
        let state = store.read_state_typed(&session_id).unwrap();
        assert_eq!(
            serde_json::to_value(state.status).unwrap(),
            json!("completed")
        );

        let events = read_jsonl(&session_path.join("EVENTS.jsonl")).unwrap();
        assert!(events.iter().any(|e| e["type"] == "synthesis_created"));
        assert!(events.iter().any(|e| e["type"] == "session_completed"));
    }

    #[test]
    fn test_malformed_worker_output_is_skipped() {
        let (_dir, store, session_id) = ready_session();
        let path = store
            .session_path(&session_id)
            .join("workers/json/analyzer_output.json");
        std::fs::write(path, "{not valid json").unwrap();

        signal_ready(&store, &session_id);
        let outcome = synthesize(&store, &session_id).unwrap();
        assert!(outcome.sources.is_empty());
    }
}
