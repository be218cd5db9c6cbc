//! Logging initialization for DevConnect binaries.
//!
//! Thin wrapper over the observability crate: structured JSONL goes to
//! the file returned by [`Paths::log_file`], with the level taken from
//! `RUST_LOG` or the configured default.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for a named service.
///
/// `verbose` mirrors events to stderr in addition to the log file.
///
/// ```ignore
/// init_logging("cli", "info", &paths, false);
/// tracing::info!("ready");
/// ```
pub fn init_logging(service_name: &str, level: &str, paths: &Paths, verbose: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr: verbose,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level. Unknown values fall back to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
