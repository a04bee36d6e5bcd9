//! File logging for preview-ctl.
//!
//! Editors invoke the CLI on every save, so stderr stays quiet and logs go to
//! a daily rolling file under `~/.preview-sync/logs`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "preview-ctl.log";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn init() -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env("PREVIEW_CTL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_dir) = preview_core::get_log_dir() else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(std::io::stderr)
            .init();
        return None;
    };

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
