//! Client configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default API base URL (can be overridden at compile time via DEVCONNECT_API_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("DEVCONNECT_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_API_URL: &str = "DEVCONNECT_API_URL";
const ENV_LOG_LEVEL: &str = "DEVCONNECT_LOG_LEVEL";
const ENV_REQUEST_TIMEOUT: &str = "DEVCONNECT_REQUEST_TIMEOUT_SECS";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the DevConnect REST API, e.g. `https://api.example.com/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from `DEVCONNECT_*` environment variables.
    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored, as
    /// are timeouts that do not parse.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_base_url = api_url.trim().to_string();
        }
        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = log_level.trim().to_string();
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT).and_then(|v| v.trim().parse().ok()) {
            self.request_timeout_secs = timeout;
        }
    }

    /// Check that the API URL is an absolute http(s) URL and the timeout is non-zero.
    pub fn validate(&self) -> CoreResult<()> {
        let url = self.api_base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "api_base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
