use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use journal_migrate::{logging, Config, Verifier};

/// Exit status for `--strict` runs that find a count mismatch.
const MISMATCH_EXIT: u8 = 2;

#[derive(Parser)]
#[command(
    name = "verify",
    about = "Compare legacy source and target store row counts"
)]
struct Cli {
    /// Exit with status 2 when any entity mismatches
    #[arg(long)]
    strict: bool,

    /// Print the verification report as JSON
    #[arg(long)]
    json: bool,
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
    let (source, store) = journal_migrate::connect(&config)
        .await
        .context("open source and target stores")?;

    let report = Verifier::from_config(&source, &store, &config)
        .verify()
        .await
        .context("verify migration")?;
    store.close().await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize verification report")?
        );
    } else {
        for line in report.parity_lines() {
            println!("{line}");
        }
        print!("{}", report.sample_listing());
    }

    if cli.strict && !report.all_match() {
        return Ok(ExitCode::from(MISMATCH_EXIT));
    }
    Ok(ExitCode::SUCCESS)
}
