//! Logging setup for the `psort` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary. CLI commands log to stderr so stdout stays machine-readable.
//! The TUI owns the terminal, so it logs to a daily file instead.

use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter (e.g. `debug`, `patch_sorter=trace`).
pub const LOG_ENV: &str = "PSORT_LOG";

/// Environment variable overriding the data directory used for log files.
pub const DATA_DIR_ENV: &str = "PSORT_DATA_DIR";

static INIT: Once = Once::new();

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize logging to stderr.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_logging(json: bool) {
    INIT.call_once(|| {
        let filter = env_filter("warn");
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    });
}

/// Directory where log files are written.
pub fn log_dir() -> Option<PathBuf> {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join("logs")),
        _ => Some(dirs::data_dir()?.join("patch-sorter").join("logs")),
    }
}

/// Initialize logging to a daily rolling file in `dir`.
///
/// The returned guard flushes pending lines when dropped and must be held for
/// as long as logging is needed.
#[cfg(feature = "tui")]
pub fn init_file_logging(dir: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "psort.log"));

    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(env_filter("info"))
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .init();
    });

    Ok(guard)
}

/// Describe where file logs go, for display.
pub fn describe_log_dir(dir: Option<&Path>) -> String {
    match dir {
        Some(dir) => dir.display().to_string(),
        None => "(no data directory)".to_string(),
    }
}
