//! Subscriber installation and the JSONL log file.
//!
//! Several CLI processes may append to the same file at once, so the file is
//! opened in append mode and each event line is written and flushed while the
//! writer lock is held.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `~/.devconnect/logs/client.jsonl`, or the temp dir when there is no home.
fn default_log_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    base.join(".devconnect").join("logs").join("client.jsonl")
}

/// Append-only log file shared by every event.
#[derive(Clone)]
pub(crate) struct LogFile(Arc<Mutex<LineWriter<File>>>);

impl LogFile {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(Arc::new(Mutex::new(LineWriter::new(file)))))
    }
}

/// Exclusive handle for one event.
pub(crate) struct LogFileGuard<'a>(MutexGuard<'a, LineWriter<File>>);

impl Write for LogFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard(self.0.lock())
    }
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the JSONL file layer and, when asked, a stderr layer.
///
/// An unopenable log file downgrades to stderr-only output.
pub(crate) fn install(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);
    let log_file = LogFile::open(&log_path);

    let open_error = log_file.as_ref().err().map(|e| e.to_string());
    let file_layer = log_file.ok().map(|file| {
        JsonLayer::new(config.service_name.clone(), file, config.redact_sensitive)
            .with_filter(filter(&config.default_level))
    });

    let stderr_layer = (config.also_stderr || open_error.is_some()).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .with_filter(filter(&config.default_level))
    });

    if tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_err()
    {
        return;
    }

    match open_error {
        Some(error) => tracing::warn!(
            log_path = %log_path.display(),
            %error,
            "Log file unavailable, logging to stderr only"
        ),
        None => tracing::debug!(log_path = %log_path.display(), "Logging initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("client.jsonl");

        let file = LogFile::open(&path).unwrap();
        writeln!(file.make_writer(), "{{\"msg\":\"hello\"}}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"msg\":\"hello\"}\n");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.jsonl");

        writeln!(LogFile::open(&path).unwrap().make_writer(), "first").unwrap();
        writeln!(LogFile::open(&path).unwrap().make_writer(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_default_log_path_is_under_devconnect() {
        let path = default_log_path();
        assert!(path.ends_with(".devconnect/logs/client.jsonl"));
    }
}
