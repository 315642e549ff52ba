//! Logging infrastructure for quarry.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `logs/quarry.log` by default (cleared on session start)
//! - Also prints to stdout
//! - Configurable via the RUST_LOG environment variable

use crate::config::LoggingSettings;
use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log directory, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "quarry.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes the global `tracing` subscriber.
///
/// Creates `log_dir` if needed, truncates any previous `log_file`, and
/// installs a file layer plus a stdout layer behind an `EnvFilter` that
/// defaults to `filter` when RUST_LOG is unset.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot
/// be cleared.
pub fn init_logging(log_dir: &str, log_file: &str, filter: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initializes logging from the `[logging]` section of the config file.
pub fn init_logging_from(settings: &LoggingSettings) -> Result<LoggingGuard, io::Error> {
    let dir = settings.directory.to_string_lossy();
    init_logging(&dir, &settings.file, &settings.level)
}
