use anyhow::Result;
use serde::Serialize;

use crate::generator::GenerationOutcome;
use crate::log::LogEntry;
use crate::models::PluginArtifact;

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    artifacts: &'a [PluginArtifact],
    log: &'a [LogEntry],
}

pub fn to_string(outcome: &GenerationOutcome, log: &[LogEntry]) -> Result<String> {
    let report = JsonReport {
        success: outcome.success,
        artifacts: &outcome.artifacts,
        log,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
