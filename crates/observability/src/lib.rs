//! # Observability
//!
//! Logging setup for the DevConnect binaries.
//!
//! Library crates only emit events through the `tracing` macros. A binary
//! calls [`init_with_config`] once at startup, which installs:
//!
//! - a JSONL file layer (one object per event, see [`json_layer`] for the shape)
//! - an optional compact stderr layer for interactive use
//!
//! Both layers are filtered by `RUST_LOG` when set, else by
//! [`LogConfig::default_level`]. Fields whose key names a credential
//! (`access_token`, `password`, `authorization`, ...) and bearer or JWT-shaped
//! values are written as `[REDACTED]`.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!(username = "alice", "Login successful");
//! ```
//!
//! Reading the file: `tail -f ~/.devconnect/logs/client.jsonl | jq`.

mod file_sink;
pub mod json_layer;
mod redact;

use std::path::PathBuf;

pub use json_layer::JsonLayer;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written as `service` on every line.
    pub service_name: String,

    /// Filter directive used when `RUST_LOG` is unset.
    pub default_level: String,

    /// JSONL destination. `None` means `~/.devconnect/logs/client.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Mirror events to stderr.
    pub also_stderr: bool,

    /// Replace credential fields and bearer/JWT-shaped values with
    /// `[REDACTED]` in the JSONL output. Only tests that inspect raw field
    /// values turn this off.
    pub redact_sensitive: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "devconnect".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            redact_sensitive: true,
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process has any effect.
pub fn init_with_config(config: LogConfig) {
    file_sink::install(&config);
}
