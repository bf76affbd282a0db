//! Typed worker report: the canonical output base extended with finding
//! records and domain scores.
//!
//! Specializations are enumerated by worker type, not by subclassing: the
//! report shape is shared and the profile's score keys tag which domain
//! scores a given worker type contributes. Scores are stored by the core but
//! never interpreted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Finding, WorkerConfig, WorkerOutput};
use crate::session::iso_now;

use super::profiles::WorkerProfile;

/// Full structured report a worker writes to `workers/json/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerReport {
    #[serde(flatten)]
    pub base: WorkerOutput,
    /// Typed finding records with severity classification
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Domain scores in [0, 10], keyed per worker type
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl WorkerReport {
    /// Enrich a model-produced report with envelope context.
    ///
    /// `worker`, `session_id`, `timestamp`, and `config` are filled when the
    /// model left them blank; domain scores are restricted to the profile's
    /// keys and clamped into [0, 10]. Missing fields already round-tripped
    /// through serde defaults, so enrichment never fails.
    pub fn enrich(
        &mut self,
        profile: &WorkerProfile,
        session_id: &str,
        task_description: &str,
    ) {
        if self.base.worker.is_empty() {
            self.base.worker = profile.worker_type.as_str().to_string();
        }
        if self.base.session_id.is_empty() {
            self.base.session_id = session_id.to_string();
        }
        if self.base.timestamp.is_empty() {
            self.base.timestamp = iso_now();
        }
        if self.base.config.is_none() {
            self.base.config = Some(WorkerConfig::for_worker(
                profile.worker_type,
                session_id,
                task_description,
            ));
        }

        self.scores = self
            .scores
            .iter()
            .filter(|(key, _)| profile.score_keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clamp(0.0, 10.0)))
            .collect();

        // Derived metrics stay consistent with the findings list
        if self.base.metrics.issues_found == 0 && !self.findings.is_empty() {
            self.base.metrics.issues_found = self.findings.len() as u64;
        }
        if self.base.metrics.severity_breakdown.is_empty() {
            for finding in &self.findings {
                *self
                    .base
                    .metrics
                    .severity_breakdown
                    .entry(finding.severity.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Counts the worker type considers salient for its completion event.
    pub fn completion_details(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.base.status,
            "findings": self.findings.len(),
            "items_analyzed": self.base.metrics.items_analyzed,
            "issues_found": self.base.metrics.issues_found,
            "files_examined": self.base.files_examined.len(),
            "scores": self.scores,
        })
    }
}

/// Parse a model's structured arguments into a report, applying defaults.
pub fn report_from_value(value: &serde_json::Value) -> anyhow::Result<WorkerReport> {
    serde_json::from_value(value.clone())
        .map_err(|err| crate::errors::HiveError::Validation(err.to_string()).into())
}
