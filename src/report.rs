//! Persistence of the final execution report.

use std::path::{Path, PathBuf};

use agent_core::ExecutionReport;
use anyhow::{Context, Result};
use tracing::info;

/// Write the report as pretty-printed JSON next to the screenshot
/// artifacts, named by execution-id prefix. Returns the written path.
pub fn save_report(report: &ExecutionReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifacts dir {}", dir.display()))?;

    let prefix: String = report.execution_id.chars().take(8).collect();
    let path = dir.join(format!("result-{prefix}.json"));
    let body = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(&path, body)
        .with_context(|| format!("failed to write report {}", path.display()))?;

    info!(path = %path.display(), "full result saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let report = ExecutionReport {
            success: true,
            error: None,
            execution_id: "0123456789abcdef".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            steps_completed: vec![0, 1],
            screenshots: vec!["screenshots/step-2.html".to_string()],
            agent_reasoning: "{\"success\":true}".to_string(),
        };

        let path = save_report(&report, dir.path()).unwrap();
        assert!(path.ends_with("result-01234567.json"));

        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: ExecutionReport = serde_json::from_str(&body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.steps_completed, vec![0, 1]);
    }
}
