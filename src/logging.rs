/// File logging via `tracing`.
///
/// The terminal belongs to the TUI, so events go only to
/// `stairwell.log`. Verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "stairwell.log";

/// Start logging. Keep the returned guard alive until exit, or buffered
/// lines are lost.
pub fn init() -> std::io::Result<WorkerGuard> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!("log file: {}", log_dir.join(LOG_FILE).display());
    Ok(guard)
}

/// `$STAIRWELL_LOG_DIR`, else `~/.local/share/stairwell/logs`, else `./logs`.
pub fn log_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os("STAIRWELL_LOG_DIR") {
        return PathBuf::from(dir);
    }
    crate::config::data_home()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
