use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this crate
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("edubot={level}")))
}

/// Log to a daily-rolling file; the interactive client owns stdout
///
/// The returned guard flushes buffered lines when dropped and must be kept
/// alive for the whole session.
pub fn init_file_logging(dir: &Path, level: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, "edubot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter(level))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

/// Log to stderr, for one-shot commands
pub fn init_stderr_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter(level))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}
