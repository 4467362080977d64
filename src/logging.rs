use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes console logging and, when enabled, a daily-rolling JSON log file.
///
/// The returned guard must be kept alive for buffered file logs to be flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("check_manager=info,checkmgr=info"));

    if !config.json_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return None;
    }

    let _ = fs::create_dir_all(&config.dir);

    let file_appender = tracing_appender::rolling::daily(&config.dir, "checkmgr.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installs the global subscriber, so this is the only test that may call it
    #[test]
    fn test_init_logging_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LoggingConfig {
            dir: log_dir.to_string_lossy().to_string(),
            json_file: true,
        };

        let guard = init_logging(&config);
        assert!(guard.is_some());
        assert!(log_dir.is_dir());

        tracing::info!(target: "check_manager", "logging initialized");
        drop(guard);

        let written = std::fs::read_dir(&log_dir).unwrap().count();
        assert_eq!(written, 1);
    }
}
