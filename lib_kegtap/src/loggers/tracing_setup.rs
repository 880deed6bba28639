//! # Setup Logging
//!
//! Configures the `tracing` subscriber to handle application logging.
//!
//! Logging is set up to:
//! - Take the filter from `RUST_LOG` when set, otherwise from the configured level.
//! - Write logs to both standard output (console) and a daily rotating file.
//! - Console logs are human-readable with ANSI color support.
//! - File logs are JSON-formatted for structured analysis.

use std::io;
use std::path::Path;

use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// Files are named `<app_name>.log.<YYYY-MM-DD>` inside `log_dir`, which is created
/// if missing. The returned guard flushes the file writer when dropped, so the
/// caller must hold it for the lifetime of the process.
///
/// # Errors
/// Fails if the directory cannot be created, the level is not a valid filter, or a
/// global subscriber is already installed.
pub fn setup_logging(app_name: &str, log_dir: &Path, log_level: &str) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, format!("{app_name}.log"));
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    info!(app_name, log_dir = %log_dir.display(), log_level, "Logging initialized");
    Ok(guard)
}
