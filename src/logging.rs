use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILTER_VAR: &str = "JOURNAL_MIGRATE_LOG";
pub const LOG_DIR_VAR: &str = "MIGRATE_LOG_DIR";
pub const DEFAULT_FILTER: &str = "journal_migrate=info,sqlx=warn";
const LOG_FILE_PREFIX: &str = "journal-migrate.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_new(
        std::env::var(LOG_FILTER_VAR).unwrap_or_else(|_| DEFAULT_FILTER.into()),
    )
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the JSON subscriber used by both binaries.
///
/// Events go to stderr so stdout stays free for summaries. When
/// `MIGRATE_LOG_DIR` is set a daily-rolled file sink is added; the returned
/// guard must be held until exit or buffered lines are lost. Fails if a
/// global subscriber is already installed.
pub fn init() -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_VAR) {
        Some(dir) if !dir.is_empty() => {
            let (layer, guard) = file_layer(Path::new(&dir))?;
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    // `try_init` also installs the `log` bridge.
    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}

fn file_layer<S>(
    dir: &Path,
) -> anyhow::Result<(Box<dyn tracing_subscriber::Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer)
        .boxed();
    Ok((layer, guard))
}
