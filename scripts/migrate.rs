use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use journal_migrate::import::write_migration_report;
use journal_migrate::{logging, Config, Importer};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "migrate",
    about = "Copy the legacy training journal into the target store"
)]
struct Cli {
    /// Directory for the JSON run report (overrides MIGRATE_REPORTS_DIR)
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Print the full per-entity report instead of the summary
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env().context("load configuration")?;
    info!(target: "journal_migrate", event = "config_loaded", config = ?config);

    let (source, store) = journal_migrate::connect(&config)
        .await
        .context("open source and target stores")?;
    let report = Importer::new(&source, &store)
        .run_with_deadline(config.job_deadline)
        .await?;
    store.close().await;

    if let Some(dir) = cli.reports_dir.or_else(|| config.reports_dir.clone()) {
        let path = write_migration_report(&dir, &config.source_url, &report)?;
        info!(target: "journal_migrate", event = "report_written", path = %path.display());
    }

    let output = if cli.report {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string_pretty(&report.summary())
    }
    .context("serialize summary")?;
    println!("{output}");

    let failed = report.extraction_failures();
    if failed.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    let names: Vec<&str> = failed.iter().map(|entity| entity.as_str()).collect();
    eprintln!("extraction failed for: {}", names.join(", "));
    Ok(ExitCode::FAILURE)
}
