//! Run report export
//!
//! Serializes the aggregate report and per-session outcomes to JSON.

use crate::report::AggregateReport;
use crate::session::SessionOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Parameters the run was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub endpoint: String,
    pub traders: usize,
    pub duration: Duration,
    pub interval: Duration,
    pub max_concurrency: usize,
    pub seed: Option<u64>,
}

/// Combined export containing all run outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub parameters: RunParameters,
    pub peak_concurrency: usize,
    pub report: AggregateReport,
    pub outcomes: Vec<SessionOutcome>,
}

/// Build a complete run export.
pub fn build_export(
    parameters: RunParameters,
    report: &AggregateReport,
    outcomes: &[SessionOutcome],
    peak_concurrency: usize,
) -> RunExport {
    let mut outcomes = outcomes.to_vec();
    // Completion order is arbitrary; sort so exports diff cleanly.
    outcomes.sort_by(|a, b| a.trader_id.cmp(&b.trader_id));

    RunExport {
        version: crate::VERSION.to_string(),
        run_id: Uuid::now_v7(),
        generated_at: Utc::now(),
        parameters,
        peak_concurrency,
        report: report.clone(),
        outcomes,
    }
}

/// Export complete run data as JSON.
pub fn export_json(export: &RunExport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(export)
}

/// Write export to a file path.
pub fn write_to_file(export: &RunExport, path: impl AsRef<Path>) -> std::io::Result<()> {
    let json = export_json(export)?;
    std::fs::write(path, json)
}
