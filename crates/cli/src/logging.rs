use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a plain-text file layer and a stderr console layer that only
/// shows warnings and errors.
///
/// The returned guard must live until the run ends or buffered file lines
/// are lost.
pub fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory)
        .with_context(|| format!("could not create log directory: {}", directory.display()))?;
    let file_name = log_file
        .file_name()
        .with_context(|| format!("log file has no file name: {}", log_file.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("could not install the log subscriber")?;

    tracing::info!("logging to {}", log_file.display());
    Ok(guard)
}
