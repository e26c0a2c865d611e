//! Logging setup.
//!
//! Log records go to a file in the configured directory and, from `warn`
//! upwards, to stderr. The level is controlled by `RUST_LOG` and defaults to
//! [`DEFAULT_FILTER`].

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "terralayer=info,terralayer_cli=info";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "terralayer.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the background log writer alive. Dropping it flushes the file.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    /// Path of the log file being written.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Installs the global subscriber.
///
/// # Arguments
///
/// * `directory` - Directory for the log file, created if missing
/// * `file_name` - Log file name within `directory`
pub fn init_logging(directory: &Path, file_name: &str) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(timer)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    let log_file = directory.join(file_name);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_file.display(),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _worker: worker,
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_logging_once() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs");

        let guard = init_logging(&dir, DEFAULT_LOG_FILE).unwrap();
        assert_eq!(guard.log_file(), dir.join(DEFAULT_LOG_FILE));
        assert!(dir.is_dir());

        assert!(matches!(
            init_logging(&dir, DEFAULT_LOG_FILE),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }
}
