//! Tracing subscriber setup.
//!
//! Logs go to stderr, or to a file through a non-blocking
//! `tracing-appender` writer when [`LoggingSettings::file`] is set. `RUST_LOG`
//! takes precedence over the configured level.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigError, LoggingSettings};

/// Build the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|e| ConfigError::InvalidValue {
        key: "logging.level".to_string(),
        value: settings.level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// Returns the file writer's guard when logging to a file; keep it alive
/// for the lifetime of the process or buffered lines are lost.
///
/// Installing twice is not an error: the second subscriber is ignored.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = env_filter(settings)?;

    match &settings.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().ok_or_else(|| ConfigError::InvalidValue {
                key: "logging.file".to_string(),
                value: path.display().to_string(),
                reason: "not a file path".to_string(),
            })?;

            fs::create_dir_all(directory).map_err(|e| ConfigError::Load {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Ok(Some(guard))
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            Ok(None)
        }
    }
}
