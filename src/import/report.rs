use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::execute::{MigrationReport, MigrationSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrationReportFile<'a> {
    generated_at: String,
    source_url: &'a str,
    summary: MigrationSummary,
    report: &'a MigrationReport,
}

/// Write the run report as pretty JSON under `reports_dir`, named after the
/// current UTC time.
pub fn write_migration_report(
    reports_dir: &Path,
    source_url: &str,
    report: &MigrationReport,
) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("create reports directory {}", reports_dir.display()))?;

    let timestamp = Utc::now().format("migration-%Y%m%d-%H%M%S.json");
    let path = reports_dir.join(timestamp.to_string());
    let payload = MigrationReportFile {
        generated_at: Utc::now().to_rfc3339(),
        source_url,
        summary: report.summary(),
        report,
    };
    let json = serde_json::to_string_pretty(&payload).context("serialize migration report")?;
    fs::write(&path, json)
        .with_context(|| format!("write migration report {}", path.display()))?;
    Ok(path)
}
